//! The processing stage.
//!
//! Pops samples, asks the pattern oracle to extract patterns, and commits
//! the outcome to the shared learning state. A failed extraction still marks
//! the origin processed so a sample that can never be learned from is not
//! re-collected on every sweep.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{CodeSample, LearningState, OracleError, OracleKind, Pattern, PatternOracle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bounded;
use crate::queue::QueueReceiver;

/// What happened to one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Patterns were merged into the knowledge base.
    Learned { patterns: usize },
    /// Extraction failed; the origin was marked processed anyway.
    Failed,
    /// The origin had already been processed; nothing was done.
    Duplicate,
}

/// Handed back by [`ProcessingStage::run`] so the caller can account for
/// work the stage never finished.
pub struct ProcessorExit {
    /// The receiving end of the work queue; samples still pending in it were
    /// never started.
    pub queue: QueueReceiver,
    /// Samples whose extraction was cut short by shutdown (zero or one).
    pub interrupted: usize,
}

impl ProcessorExit {
    /// Queued plus interrupted samples.
    pub fn abandoned(&self) -> usize {
        self.queue.pending() + self.interrupted
    }
}

/// The consumer side of the pipeline.
pub struct ProcessingStage {
    oracle: Arc<dyn PatternOracle>,
    state: Arc<LearningState>,
    queue: QueueReceiver,
    oracle_timeout: Duration,
    cancel: CancellationToken,
}

impl ProcessingStage {
    pub fn new(
        oracle: Arc<dyn PatternOracle>,
        state: Arc<LearningState>,
        queue: QueueReceiver,
        oracle_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            oracle,
            state,
            queue,
            oracle_timeout,
            cancel,
        }
    }

    /// Processes samples until the queue reports shutdown.
    pub async fn run(mut self) -> ProcessorExit {
        info!("Processing stage started");
        let mut interrupted = 0;
        while let Some(sample) = self.queue.pop().await {
            let origin = sample.origin.clone();
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(origin = %origin, "Extraction interrupted by shutdown");
                    interrupted = 1;
                    break;
                }
                outcome = self.process(sample) => outcome,
            };
            debug!(origin = %origin, ?outcome, "Sample processed");
        }
        info!("Processing stage stopped");
        ProcessorExit {
            queue: self.queue,
            interrupted,
        }
    }

    /// Extracts and commits a single sample.
    pub async fn process(&self, sample: CodeSample) -> SampleOutcome {
        if self.state.has(&sample.origin) {
            return SampleOutcome::Duplicate;
        }

        match self.extract(&sample).await {
            Ok(patterns) => {
                let count = patterns.len();
                if self
                    .state
                    .commit_success(sample.origin, sample.language, patterns)
                {
                    SampleOutcome::Learned { patterns: count }
                } else {
                    SampleOutcome::Duplicate
                }
            }
            Err(e) => {
                warn!(
                    origin = %sample.origin,
                    language = %sample.language,
                    error = %e,
                    "Pattern extraction failed; marking sample processed"
                );
                if self.state.commit_failure(sample.origin) {
                    SampleOutcome::Failed
                } else {
                    SampleOutcome::Duplicate
                }
            }
        }
    }

    async fn extract(&self, sample: &CodeSample) -> Result<Vec<Pattern>, OracleError> {
        let call = self.oracle.extract(&sample.code, sample.language);
        bounded(self.oracle_timeout, OracleKind::Pattern, call).await
    }
}
