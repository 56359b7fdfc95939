//! Shared value types for the Code Monster pipeline domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! the data that flows between stages: samples collected from sources,
//! patterns extracted from them, and the request/verdict shapes exchanged with
//! the generation and validation oracles.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OriginId, SourceName};

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Programming language tag carried by samples, patterns and requests.
///
/// Anything that is neither Python nor JavaScript is learned under
/// [`Language::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Python source.
    Python,
    /// JavaScript source (including ES modules and CommonJS).
    JavaScript,
    /// Any other language.
    Other,
}

impl Language {
    /// Parses a language tag case-insensitively. Unknown tags map to
    /// [`Language::Other`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Self::Python,
            "javascript" | "js" => Self::JavaScript,
            _ => Self::Other,
        }
    }

    /// Maps a file extension (without the dot) to a language, returning
    /// `None` for extensions that are not source files we learn from.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Self::Python),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            _ => None,
        }
    }

    /// Returns the lowercase tag for this language.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

// ---------------------------------------------------------------------------
// Samples and patterns
// ---------------------------------------------------------------------------

/// A raw code sample produced by a source oracle.
///
/// Immutable once queued; consumed exactly once by the processing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSample {
    /// Where the sample came from. Unique per source.
    pub origin: OriginId,

    /// Name of the configured source that produced this sample.
    pub source: SourceName,

    /// Language the code is written in.
    pub language: Language,

    /// Raw source text.
    pub code: String,

    /// When the source oracle collected the sample.
    pub collected_at: Timestamp,
}

/// A pattern extracted from a code sample by the pattern oracle.
///
/// The descriptor is opaque to the pipeline; only the pattern oracle and the
/// generation oracle interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Language the pattern was learned from.
    pub language: Language,

    /// Structured description of the pattern.
    pub descriptor: serde_json::Value,
}

impl Pattern {
    /// Creates a new pattern.
    pub fn new(language: Language, descriptor: serde_json::Value) -> Self {
        Self {
            language,
            descriptor,
        }
    }
}

// ---------------------------------------------------------------------------
// Generation and validation
// ---------------------------------------------------------------------------

/// Outcome of one validation oracle call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// `true` when the candidate is accepted.
    pub passed: bool,

    /// Human-readable findings. Usually empty when `passed` is `true`.
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

impl Verdict {
    /// A passing verdict with no diagnostics.
    pub fn pass() -> Self {
        Self {
            passed: true,
            diagnostics: Vec::new(),
        }
    }

    /// A failing verdict carrying the given diagnostics.
    pub fn fail(diagnostics: Vec<String>) -> Self {
        Self {
            passed: false,
            diagnostics,
        }
    }
}

/// What the generation oracle needs to revise a failing candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairContext {
    /// Zero-based index of the attempt that failed.
    pub attempt: u32,

    /// The candidate that failed validation.
    pub previous_code: String,

    /// Diagnostics reported for `previous_code`.
    pub diagnostics: Vec<String>,
}

/// A single call to the generation oracle.
///
/// `repair` is `None` for the initial candidate and `Some` for every revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Natural-language description of the code to produce.
    pub prompt: String,

    /// Target language.
    pub language: Language,

    /// Recently learned patterns for `language`, oldest first.
    #[serde(default)]
    pub known_patterns: Vec<Pattern>,

    /// Present when this call revises a failing candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair: Option<RepairContext>,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Point-in-time snapshot of what the pipeline has learned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningStatus {
    /// Origins marked in the Dedup Ledger (successful and failed extractions).
    pub processed_count: usize,

    /// Origins whose extraction failed. Always `<= processed_count`.
    pub failed_count: usize,

    /// Number of patterns held per language.
    pub knowledge_size_by_language: BTreeMap<Language, usize>,

    /// Languages with at least one learned pattern.
    pub supported_languages: Vec<Language>,
}

impl LearningStatus {
    /// Origins whose extraction succeeded.
    pub fn learned_count(&self) -> usize {
        self.processed_count - self.failed_count
    }

    /// Total patterns across all languages.
    pub fn total_patterns(&self) -> usize {
        self.knowledge_size_by_language.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_tags_parse_case_insensitively() {
        assert_eq!(Language::from_tag("Python"), Language::Python);
        assert_eq!(Language::from_tag(" JS "), Language::JavaScript);
        assert_eq!(Language::from_tag("rust"), Language::Other);
        assert_eq!("javascript".parse::<Language>().unwrap(), Language::JavaScript);
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("MJS"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("md"), None);
    }

    #[test]
    fn test_language_serializes_as_lowercase_tag() {
        let json = serde_json::to_string(&Language::JavaScript).unwrap();
        assert_eq!(json, "\"javascript\"");
    }

    #[test]
    fn test_generation_request_omits_absent_repair_context() {
        let request = GenerationRequest {
            prompt: "add two numbers".into(),
            language: Language::Python,
            known_patterns: vec![],
            repair: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("repair").is_none());
        assert_eq!(json["language"], "python");
    }

    #[test]
    fn test_status_learned_count_excludes_failures() {
        let mut status = LearningStatus {
            processed_count: 5,
            failed_count: 2,
            ..Default::default()
        };
        status.knowledge_size_by_language.insert(Language::Python, 4);
        status.knowledge_size_by_language.insert(Language::JavaScript, 3);
        assert_eq!(status.learned_count(), 3);
        assert_eq!(status.total_patterns(), 7);
    }
}
