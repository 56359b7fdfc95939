//! The orchestrator: lifecycle of the two background stages plus the
//! generation and status entry points.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use pipeline::{
    GenerationFailure, GenerationRequest, GenerationRequestId, Language, LearningState,
    LearningStatus, OracleKind, Oracles, PipelineConfig, PipelineError, ShutdownReport,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::bounded;
use crate::collector::CollectionStage;
use crate::processor::{ProcessingStage, ProcessorExit};
use crate::queue::work_queue;
use crate::repair::{RepairLoop, RepairReport};

struct RunningStages {
    cancel: CancellationToken,
    collector: JoinHandle<()>,
    processor: JoinHandle<ProcessorExit>,
}

enum Lifecycle {
    Idle,
    Running(RunningStages),
    Stopped,
}

/// Owns the shared learning state and the background stages.
///
/// Generation requests take `&self` and may run concurrently with each other
/// and with the background stages; wrap the orchestrator in an [`Arc`] to
/// share it.
pub struct Orchestrator {
    config: PipelineConfig,
    oracles: Oracles,
    state: Arc<LearningState>,
    lifecycle: Mutex<Lifecycle>,
}

impl Orchestrator {
    /// Creates an orchestrator with empty learning state.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if `config` does not validate.
    pub fn new(config: PipelineConfig, oracles: Oracles) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            oracles,
            state: Arc::new(LearningState::new()),
            lifecycle: Mutex::new(Lifecycle::Idle),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The shared learning state, for read-only inspection.
    pub fn learning_state(&self) -> &LearningState {
        &self.state
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle(), Lifecycle::Running(_))
    }

    /// Spawns the collection and processing stages and returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyStarted`] on any call after the first,
    /// including after [`Orchestrator::stop`].
    pub fn start(&self) -> Result<(), PipelineError> {
        let mut lifecycle = self.lifecycle();
        if !matches!(*lifecycle, Lifecycle::Idle) {
            return Err(PipelineError::AlreadyStarted);
        }

        let cancel = CancellationToken::new();
        let (tx, rx) = work_queue(self.config.queue_capacity, cancel.clone());

        let collector = CollectionStage::new(
            Arc::clone(&self.oracles.source),
            self.config.sources.clone(),
            Arc::clone(&self.state),
            tx,
            self.config.collection_interval(),
            self.config.oracle_timeout(),
            cancel.clone(),
        );
        let processor = ProcessingStage::new(
            Arc::clone(&self.oracles.pattern),
            Arc::clone(&self.state),
            rx,
            self.config.oracle_timeout(),
            cancel.clone(),
        );

        *lifecycle = Lifecycle::Running(RunningStages {
            cancel,
            collector: tokio::spawn(collector.run()),
            processor: tokio::spawn(processor.run()),
        });
        info!(
            sources = self.config.sources.len(),
            queue_capacity = ?self.config.queue_capacity,
            "Pipeline started"
        );
        Ok(())
    }

    /// Cancels both stages and waits for them to exit.
    ///
    /// Waits at most the configured shutdown timeout; a stage still running
    /// after that is aborted and the report's `timed_out` flag is set. Queued
    /// samples are never processed after `stop`; they are counted as
    /// abandoned together with a sample whose extraction was interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotRunning`] if the stages are not running.
    pub async fn stop(&self) -> Result<ShutdownReport, PipelineError> {
        let mut stages = {
            let mut lifecycle = self.lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(stages) => stages,
                other => {
                    *lifecycle = other;
                    return Err(PipelineError::NotRunning);
                }
            }
        };

        let timeout = self.config.shutdown_timeout();
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + timeout;
        stages.cancel.cancel();

        let mut timed_out = false;
        match tokio::time::timeout_at(deadline, &mut stages.collector).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Collection stage terminated abnormally"),
            Err(_) => {
                timed_out = true;
                stages.collector.abort();
            }
        }

        let mut abandoned_samples = 0;
        match tokio::time::timeout_at(deadline, &mut stages.processor).await {
            Ok(Ok(exit)) => abandoned_samples = exit.abandoned(),
            Ok(Err(e)) => error!(error = %e, "Processing stage terminated abnormally"),
            Err(_) => {
                timed_out = true;
                stages.processor.abort();
            }
        }

        let report = ShutdownReport {
            timed_out,
            abandoned_samples,
            elapsed: started.elapsed(),
        };
        if timed_out {
            warn!(
                timeout_secs = timeout.as_secs(),
                abandoned_samples, "Pipeline shutdown timed out; remaining work abandoned"
            );
        } else {
            info!(
                abandoned_samples,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Pipeline stopped"
            );
        }
        Ok(report)
    }

    /// Generates code for `prompt` and repairs it until it validates.
    ///
    /// Calls the generation oracle once for the initial candidate (informed by
    /// the most recently learned patterns for `language`) and then runs one
    /// repair loop. Works whether or not the background stages are running.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationFailure::Generation`] if no initial candidate could
    /// be produced, or [`GenerationFailure::Exhausted`] carrying the last
    /// diagnostics if no candidate passed validation.
    #[instrument(
        skip_all,
        fields(request_id = %GenerationRequestId::new_random(), language = %language)
    )]
    pub async fn request_generation(
        &self,
        prompt: &str,
        language: Language,
    ) -> Result<RepairReport, GenerationFailure> {
        let request = GenerationRequest {
            prompt: prompt.to_string(),
            language,
            known_patterns: self
                .state
                .recent_patterns(language, self.config.pattern_context_limit),
            repair: None,
        };

        let timeout = self.config.oracle_timeout();
        let call = self.oracles.generation.generate(&request);
        let initial = bounded(timeout, OracleKind::Generation, call)
            .await
            .map_err(|e| {
                warn!(error = %e, "Initial generation failed");
                GenerationFailure::Generation(e)
            })?;
        info!(
            known_patterns = request.known_patterns.len(),
            "Initial candidate generated"
        );

        RepairLoop::new(
            self.oracles.generation.as_ref(),
            self.oracles.validation.as_ref(),
            self.config.max_retries,
            timeout,
        )
        .run(&request, initial)
        .await
    }

    /// A consistent snapshot of what has been learned so far.
    pub fn status(&self) -> LearningStatus {
        self.state.status()
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if let Lifecycle::Running(stages) = &*self.lifecycle() {
            stages.cancel.cancel();
        }
    }
}
