//! Code Monster local oracle adapters.
//!
//! Implements three of the [`pipeline`] port traits against the local machine:
//!
//! | Adapter | Port | Backing |
//! |---|---|---|
//! | [`DirectorySource`] | [`pipeline::SourceOracle`] | recursive directory scan |
//! | [`StructuralPatternExtractor`] | [`pipeline::PatternOracle`] | regex scan for imports, functions, classes |
//! | [`InterpreterValidator`] | [`pipeline::ValidationOracle`] | `python3 -m py_compile` / `node --check` |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** File-system access, process spawning and source-text
//! scanning live here. The orchestration core sees only the port traits and
//! applies its own timeouts around every call.

pub mod patterns;
pub mod source;
pub mod validator;

pub use patterns::StructuralPatternExtractor;
pub use source::{DirectorySource, DEFAULT_MAX_FILE_BYTES};
pub use validator::{InterpreterValidator, Interpreters};
