//! Error and outcome-report types for the Code Monster pipeline domain.
//!
//! The taxonomy mirrors how each failure is handled:
//!
//! - [`OracleError`]: transient. Logged and skipped by the background stages,
//!   never fatal to a loop.
//! - [`GenerationFailure`]: terminal for one generation request and reported
//!   to that request's caller. Never touches shared state.
//! - [`PipelineError`]: lifecycle misuse and invalid configuration.
//! - [`ShutdownReport`]: a shutdown that hit its timeout is reported, not
//!   escalated, so it is a report rather than an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Oracle errors
// ---------------------------------------------------------------------------

/// Which external collaborator an [`OracleError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
    /// Produces raw code samples.
    Source,
    /// Extracts patterns from a sample.
    Pattern,
    /// Produces candidate code.
    Generation,
    /// Judges candidate code.
    Validation,
}

impl std::fmt::Display for OracleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Source => "source",
            Self::Pattern => "pattern",
            Self::Generation => "generation",
            Self::Validation => "validation",
        };
        f.write_str(name)
    }
}

/// A failed or timed-out call to an external oracle.
///
/// A timeout is handled exactly like a failure; the variants only differ in
/// what gets logged.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OracleError {
    /// The oracle reported an error.
    #[error("{oracle} oracle failed: {message}")]
    Failed {
        /// The oracle that failed.
        oracle: OracleKind,
        /// Human-readable description supplied by the adapter.
        message: String,
    },

    /// The oracle did not answer within the caller-supplied timeout.
    #[error("{oracle} oracle timed out after {after:?}")]
    TimedOut {
        /// The oracle that timed out.
        oracle: OracleKind,
        /// The timeout that elapsed.
        after: Duration,
    },
}

impl OracleError {
    /// Shorthand for [`OracleError::Failed`].
    pub fn failed(oracle: OracleKind, message: impl Into<String>) -> Self {
        Self::Failed {
            oracle,
            message: message.into(),
        }
    }

    /// Returns the oracle this error came from.
    pub fn oracle(&self) -> OracleKind {
        match self {
            Self::Failed { oracle, .. } | Self::TimedOut { oracle, .. } => *oracle,
        }
    }

    /// Returns `true` for [`OracleError::TimedOut`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

// ---------------------------------------------------------------------------
// Generation failures
// ---------------------------------------------------------------------------

/// Why a generation request produced no usable code.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GenerationFailure {
    /// The generation oracle could not produce an initial candidate, so the
    /// repair loop never ran.
    #[error("initial generation failed: {0}")]
    Generation(OracleError),

    /// Every validation attempt failed and the retry budget is spent.
    #[error("repair retries exhausted after {validation_calls} validation calls")]
    Exhausted {
        /// Total validation calls made (`max_retries + 1`).
        validation_calls: u32,
        /// The last candidate that was validated.
        last_code: String,
        /// Diagnostics reported for `last_code`.
        last_diagnostics: Vec<String>,
    },
}

impl GenerationFailure {
    /// Diagnostics from the last failed validation, if the loop ran at all.
    pub fn last_diagnostics(&self) -> &[String] {
        match self {
            Self::Generation(_) => &[],
            Self::Exhausted {
                last_diagnostics, ..
            } => last_diagnostics,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Lifecycle and configuration errors raised by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// `start` was called on an orchestrator that has already been started.
    ///
    /// An orchestrator starts at most once, even after it has been stopped.
    #[error("pipeline has already been started")]
    AlreadyStarted,

    /// `stop` was called on an orchestrator whose stages are not running.
    #[error("pipeline is not running")]
    NotRunning,

    /// The pipeline configuration is invalid.
    ///
    /// Produced at load time; the pipeline never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl PipelineError {
    /// Shorthand for [`PipelineError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

/// What happened when the orchestrator was stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// `true` if at least one stage did not exit within the shutdown timeout
    /// and was aborted.
    pub timed_out: bool,

    /// Samples still queued when the stages exited, plus one whose extraction
    /// was interrupted by the stop. None of them is recorded as processed.
    pub abandoned_samples: usize,

    /// Wall time spent waiting for the stages.
    pub elapsed: Duration,
}
