//! The collection stage.
//!
//! Sweeps every configured source, queues samples whose origin has not been
//! processed yet, then waits for the collection interval before sweeping
//! again. Only cancellation ends the loop: a failing or hanging source is
//! logged and skipped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use pipeline::{CodeSample, LearningState, OracleError, OracleKind, SourceConfig, SourceOracle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bounded;
use crate::queue::{PushError, QueueSender};

/// Counters for one sweep, returned for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    /// Sources that answered.
    pub sources_ok: usize,
    /// Sources that failed or timed out.
    pub sources_failed: usize,
    /// Samples pushed onto the work queue.
    pub queued: usize,
    /// Samples skipped because their origin was already processed or
    /// appeared earlier in the same sweep.
    pub skipped: usize,
}

/// The producer side of the pipeline.
pub struct CollectionStage {
    oracle: Arc<dyn SourceOracle>,
    sources: Vec<SourceConfig>,
    state: Arc<LearningState>,
    queue: QueueSender,
    interval: Duration,
    oracle_timeout: Duration,
    cancel: CancellationToken,
}

impl CollectionStage {
    pub fn new(
        oracle: Arc<dyn SourceOracle>,
        sources: Vec<SourceConfig>,
        state: Arc<LearningState>,
        queue: QueueSender,
        interval: Duration,
        oracle_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            oracle,
            sources,
            state,
            queue,
            interval,
            oracle_timeout,
            cancel,
        }
    }

    /// Runs sweeps until cancelled.
    pub async fn run(self) {
        info!(
            sources = self.sources.len(),
            interval_secs = self.interval.as_secs(),
            "Collection stage started"
        );
        loop {
            let Some(summary) = self.sweep().await else {
                break;
            };
            info!(
                sources_ok = summary.sources_ok,
                sources_failed = summary.sources_failed,
                queued = summary.queued,
                skipped = summary.skipped,
                "Collection sweep finished"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("Collection stage stopped");
    }

    /// Sweeps every source once. Returns `None` if cancelled mid-sweep.
    pub async fn sweep(&self) -> Option<SweepSummary> {
        let mut summary = SweepSummary::default();
        let mut queued_this_sweep = HashSet::new();

        for source in &self.sources {
            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                fetched = self.fetch(source) => fetched,
            };
            let samples = match fetched {
                Ok(samples) => {
                    summary.sources_ok += 1;
                    samples
                }
                Err(e) => {
                    summary.sources_failed += 1;
                    warn!(source = %source.name, error = %e, "Source fetch failed; skipping");
                    continue;
                }
            };

            debug!(source = %source.name, samples = samples.len(), "Source fetched");
            for mut sample in samples {
                if self.state.has(&sample.origin)
                    || !queued_this_sweep.insert(sample.origin.clone())
                {
                    summary.skipped += 1;
                    continue;
                }
                if let Some(language) = source.language {
                    sample.language = language;
                }
                match self.queue.push(sample).await {
                    Ok(()) => summary.queued += 1,
                    Err(PushError::ShuttingDown(_)) => return None,
                    Err(PushError::Disconnected(sample)) => {
                        warn!(
                            origin = %sample.origin,
                            "Processing stage is gone; stopping collection"
                        );
                        return None;
                    }
                }
            }
        }
        Some(summary)
    }

    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<CodeSample>, OracleError> {
        bounded(self.oracle_timeout, OracleKind::Source, self.oracle.fetch(source)).await
    }
}
