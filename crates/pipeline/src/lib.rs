//! Core orchestration domain for Code Monster.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, and error type used throughout the pipeline, plus the two pieces of
//! pure business logic the stages are built around: the shared learning state
//! and the repair state machine. Infrastructure crates implement the port
//! traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies
//! and no async runtime. It defines *what* is needed; the `stages` crate
//! drives it and infrastructure crates supply the oracles.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`OriginId`, `SourceName`, `GenerationRequestId`) |
//! | [`types`] | Shared value types (`CodeSample`, `Pattern`, `Verdict`, `LearningStatus`, etc.) |
//! | [`errors`] | Oracle, generation and lifecycle errors; `ShutdownReport` |
//! | [`config`] | `PipelineConfig` and `SourceConfig` |
//! | [`ports`] | Oracle traits the stages call |
//! | [`knowledge`] | `DedupLedger` and `KnowledgeBase` containers |
//! | [`learning`] | `LearningState`: the lock-protected owner of both containers |
//! | [`repair`] | The repair loop state machine |

pub mod config;
pub mod errors;
pub mod identifiers;
pub mod knowledge;
pub mod learning;
pub mod ports;
pub mod repair;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{PipelineConfig, SourceConfig};
pub use errors::{GenerationFailure, OracleError, OracleKind, PipelineError, ShutdownReport};
pub use identifiers::{GenerationRequestId, OriginId, SourceName};
pub use knowledge::{DedupLedger, KnowledgeBase};
pub use learning::LearningState;
pub use ports::{GenerationOracle, Oracles, PatternOracle, SourceOracle, ValidationOracle};
pub use repair::{
    transition, InvalidTransition, RepairAttempt, RepairEvent, RepairMachine, RepairState,
};
pub use types::{
    CodeSample, GenerationRequest, Language, LearningStatus, Pattern, RepairContext, Timestamp,
    Verdict,
};
