//! Pipeline configuration.
//!
//! Durations are expressed in whole seconds in serialised form so the
//! configuration reads naturally in TOML (`collection_interval_secs = 3600`).
//! Loading the file is the composition root's job; this module only defines
//! the shape, the defaults, and [`PipelineConfig::validate`].

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Language, PipelineError, SourceName};

/// Default pause between collection sweeps.
pub const DEFAULT_COLLECTION_INTERVAL_SECS: u64 = 3600;
/// Default number of repair retries after the first validation.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// Default work-queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
/// Default time `stop` waits for the stages to exit.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
/// Default bound on every oracle call.
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 60;
/// Default number of learned patterns passed to the generation oracle.
pub const DEFAULT_PATTERN_CONTEXT_LIMIT: usize = 16;

/// One source the collection stage sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique name used in logs.
    pub name: SourceName,

    /// Where to collect from. Interpreted by the source oracle (a directory,
    /// a repository slug, a tag, ...).
    pub location: String,

    /// Forces every sample from this source to the given language instead of
    /// letting the oracle infer it.
    #[serde(default)]
    pub language: Option<Language>,
}

/// Tunables for the orchestration core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause between the end of one collection sweep and the start of the next.
    pub collection_interval_secs: u64,

    /// Maximum repair retries `R`; at most `R + 1` validations per request.
    pub max_retries: u32,

    /// Work-queue capacity. `None` selects an unbounded queue. When bounded
    /// and full, the collection stage waits for space.
    pub queue_capacity: Option<usize>,

    /// How long `stop` waits for both stages before abandoning them.
    pub shutdown_timeout_secs: u64,

    /// Upper bound on every individual oracle call.
    pub oracle_timeout_secs: u64,

    /// Maximum learned patterns forwarded to the generation oracle.
    pub pattern_context_limit: usize,

    /// Sources swept by the collection stage, in sweep order.
    pub sources: Vec<SourceConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collection_interval_secs: DEFAULT_COLLECTION_INTERVAL_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            queue_capacity: Some(DEFAULT_QUEUE_CAPACITY),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            oracle_timeout_secs: DEFAULT_ORACLE_TIMEOUT_SECS,
            pattern_context_limit: DEFAULT_PATTERN_CONTEXT_LIMIT,
            sources: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    /// Checks the configuration for values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] describing the first problem
    /// found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.collection_interval_secs == 0 {
            return Err(PipelineError::configuration(
                "collection_interval_secs must be greater than zero",
            ));
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(PipelineError::configuration(
                "shutdown_timeout_secs must be greater than zero",
            ));
        }
        if self.oracle_timeout_secs == 0 {
            return Err(PipelineError::configuration(
                "oracle_timeout_secs must be greater than zero",
            ));
        }
        if self.queue_capacity == Some(0) {
            return Err(PipelineError::configuration(
                "queue_capacity must be greater than zero (omit it for an unbounded queue)",
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(PipelineError::configuration(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
        }
        Ok(())
    }
}
