//! Deterministic fake oracles shared by the stage integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pipeline::{
    CodeSample, GenerationOracle, GenerationRequest, Language, OracleError, OracleKind, Oracles,
    OriginId, Pattern, PatternOracle, PipelineConfig, SourceConfig, SourceName, SourceOracle,
    Timestamp, ValidationOracle, Verdict,
};
use serde_json::json;

pub fn sample(origin: &str, language: Language, code: &str) -> CodeSample {
    CodeSample {
        origin: OriginId::new(origin).unwrap(),
        source: SourceName::new("test").unwrap(),
        language,
        code: code.to_string(),
        collected_at: Timestamp::now(),
    }
}

pub fn source(name: &str) -> SourceConfig {
    SourceConfig {
        name: SourceName::new(name).unwrap(),
        location: format!("fake://{name}"),
        language: None,
    }
}

pub fn config(sources: &[&str]) -> PipelineConfig {
    PipelineConfig {
        collection_interval_secs: 3600,
        max_retries: 5,
        queue_capacity: Some(16),
        shutdown_timeout_secs: 2,
        oracle_timeout_secs: 5,
        pattern_context_limit: 16,
        sources: sources.iter().map(|name| source(name)).collect(),
    }
}

/// Polls `condition` every 10ms until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Returns a fixed list of samples per source name; unknown names fail.
#[derive(Default)]
pub struct StaticSource {
    samples: HashMap<String, Vec<CodeSample>>,
    pub fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: &str, samples: Vec<CodeSample>) -> Self {
        self.samples.insert(source.to_string(), samples);
        self
    }
}

#[async_trait]
impl SourceOracle for StaticSource {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<CodeSample>, OracleError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.samples
            .get(source.name.as_str())
            .cloned()
            .ok_or_else(|| OracleError::failed(OracleKind::Source, "unreachable host"))
    }
}

/// Never answers.
pub struct HangingSource;

#[async_trait]
impl SourceOracle for HangingSource {
    async fn fetch(&self, _source: &SourceConfig) -> Result<Vec<CodeSample>, OracleError> {
        std::future::pending().await
    }
}

/// Panics when asked for `cursed`; every other source returns no samples.
pub struct PanickingSource;

#[async_trait]
impl SourceOracle for PanickingSource {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<CodeSample>, OracleError> {
        if source.name.as_str() == "cursed" {
            panic!("source adapter crashed on {}", source.name.as_str());
        }
        Ok(Vec::new())
    }
}

/// Blocks its worker thread for the given duration, ignoring cancellation.
pub struct BlockingSource(pub Duration);

#[async_trait]
impl SourceOracle for BlockingSource {
    async fn fetch(&self, _source: &SourceConfig) -> Result<Vec<CodeSample>, OracleError> {
        std::thread::sleep(self.0);
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Returns `per_sample` patterns for every sample, failing for code that
/// contains `POISON`.
pub struct CountingPatterns {
    per_sample: usize,
    pub calls: AtomicUsize,
}

impl CountingPatterns {
    pub fn new(per_sample: usize) -> Self {
        Self {
            per_sample,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PatternOracle for CountingPatterns {
    async fn extract(&self, code: &str, language: Language) -> Result<Vec<Pattern>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if code.contains("POISON") {
            return Err(OracleError::failed(OracleKind::Pattern, "unparseable sample"));
        }
        Ok((0..self.per_sample)
            .map(|i| Pattern::new(language, json!({ "kind": "function", "index": i })))
            .collect())
    }
}

/// Panics on code containing `BOOM`; otherwise returns one pattern.
pub struct PanickingPatterns;

#[async_trait]
impl PatternOracle for PanickingPatterns {
    async fn extract(&self, code: &str, language: Language) -> Result<Vec<Pattern>, OracleError> {
        if code.contains("BOOM") {
            panic!("extractor crashed");
        }
        Ok(vec![Pattern::new(language, json!({ "kind": "function" }))])
    }
}

/// Never answers.
pub struct HangingPatterns;

#[async_trait]
impl PatternOracle for HangingPatterns {
    async fn extract(&self, _code: &str, _language: Language) -> Result<Vec<Pattern>, OracleError> {
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Produces `v0` initially and `v{n + 1}` when revising attempt `n`.
/// Records every request it receives.
#[derive(Default)]
pub struct VersionedGenerator {
    pub requests: Mutex<Vec<GenerationRequest>>,
    fail_initial: bool,
    fail_revisions: bool,
}

impl VersionedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_initial() -> Self {
        Self {
            fail_initial: true,
            ..Self::default()
        }
    }

    pub fn failing_revisions() -> Self {
        Self {
            fail_revisions: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationOracle for VersionedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, OracleError> {
        self.requests.lock().unwrap().push(request.clone());
        match &request.repair {
            None if self.fail_initial => {
                Err(OracleError::failed(OracleKind::Generation, "model offline"))
            }
            None => Ok("v0".to_string()),
            Some(_) if self.fail_revisions => {
                Err(OracleError::failed(OracleKind::Generation, "model offline"))
            }
            Some(context) => Ok(format!("v{}", context.attempt + 1)),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Fails the first `failures` calls, then passes. Oracle errors can be
/// injected for specific call indices.
pub struct ScriptedValidator {
    failures: usize,
    errors_on: Vec<usize>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<String>>,
}

impl ScriptedValidator {
    pub fn passing_after(failures: usize) -> Self {
        Self {
            failures,
            errors_on: Vec::new(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::passing_after(usize::MAX)
    }

    pub fn erroring_on(mut self, calls: &[usize]) -> Self {
        self.errors_on = calls.to_vec();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ValidationOracle for ScriptedValidator {
    async fn validate(&self, code: &str, _language: Language) -> Result<Verdict, OracleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(code.to_string());
        if self.errors_on.contains(&call) {
            return Err(OracleError::failed(OracleKind::Validation, "interpreter crashed"));
        }
        if call < self.failures {
            Ok(Verdict::fail(vec![format!("SyntaxError in {code} (call {call})")]))
        } else {
            Ok(Verdict::pass())
        }
    }
}

// ---------------------------------------------------------------------------

pub fn oracles(
    source: Arc<dyn SourceOracle>,
    pattern: Arc<dyn PatternOracle>,
    generation: Arc<dyn GenerationOracle>,
    validation: Arc<dyn ValidationOracle>,
) -> Oracles {
    Oracles {
        source,
        pattern,
        generation,
        validation,
    }
}
