//! Port traits for the external collaborators the orchestration core drives.
//!
//! Infrastructure crates implement these; the stages only ever see
//! `Arc<dyn Trait>`. Implementations must be cheap to share across tasks and
//! must not assume they are called from any particular task. Callers bound
//! every call with their own timeout, so implementations need not.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{CodeSample, GenerationRequest, Language, OracleError, Pattern, SourceConfig, Verdict};

/// Produces raw code samples for a configured source.
#[async_trait]
pub trait SourceOracle: Send + Sync {
    /// Returns every sample currently available from `source`.
    ///
    /// Samples already seen in earlier sweeps may be returned again; the
    /// pipeline filters them.
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<CodeSample>, OracleError>;
}

/// Extracts learnable patterns from a code sample.
#[async_trait]
pub trait PatternOracle: Send + Sync {
    async fn extract(&self, code: &str, language: Language) -> Result<Vec<Pattern>, OracleError>;
}

/// Produces candidate code from a prompt, optionally revising a failed
/// candidate.
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, OracleError>;
}

/// Judges whether candidate code is acceptable.
#[async_trait]
pub trait ValidationOracle: Send + Sync {
    async fn validate(&self, code: &str, language: Language) -> Result<Verdict, OracleError>;
}

/// The full set of collaborators an orchestrator needs.
#[derive(Clone)]
pub struct Oracles {
    pub source: Arc<dyn SourceOracle>,
    pub pattern: Arc<dyn PatternOracle>,
    pub generation: Arc<dyn GenerationOracle>,
    pub validation: Arc<dyn ValidationOracle>,
}

impl std::fmt::Debug for Oracles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oracles").finish_non_exhaustive()
    }
}
