//! Shared learning state: the Dedup Ledger and Knowledge Base behind one lock.
//!
//! The processing stage is the only writer. Status queries and generation
//! requests only read. Every write happens under a single write guard, so a
//! reader sees either none or all of a sample's effects: its patterns, its
//! ledger mark, and its failure count.
//!
//! Locks are held only for in-memory work. Callers must never hold a guard
//! across an oracle call, which the API enforces by never handing one out.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use crate::{DedupLedger, KnowledgeBase, Language, LearningStatus, OriginId, Pattern};

#[derive(Debug, Default)]
struct Inner {
    ledger: DedupLedger,
    knowledge: KnowledgeBase,
    failed: usize,
}

/// Thread-safe owner of the Dedup Ledger and Knowledge Base.
#[derive(Debug, Default)]
pub struct LearningState {
    inner: RwLock<Inner>,
}

impl LearningState {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave `Inner` half-updated (every
    // mutation is a single append or insert), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if `origin` has already been processed.
    pub fn has(&self, origin: &OriginId) -> bool {
        self.read().ledger.has(origin)
    }

    /// Marks `origin` as processed without learning anything from it.
    ///
    /// Idempotent. Returns `true` if the origin was newly marked.
    pub fn mark(&self, origin: OriginId) -> bool {
        self.write().ledger.mark(origin)
    }

    /// Merges a successful extraction and marks its origin, atomically.
    ///
    /// Returns `false` and changes nothing if `origin` was already processed,
    /// so an origin contributes at most one merge no matter how often it is
    /// re-collected.
    pub fn commit_success(
        &self,
        origin: OriginId,
        language: Language,
        patterns: Vec<Pattern>,
    ) -> bool {
        let mut inner = self.write();
        if inner.ledger.has(&origin) {
            return false;
        }
        trace!(origin = %origin, %language, patterns = patterns.len(), "Merging patterns");
        inner.knowledge.append(language, patterns);
        inner.ledger.mark(origin);
        true
    }

    /// Marks a sample whose extraction failed as processed.
    ///
    /// The sample is never retried. Returns `false` if the origin was already
    /// processed.
    pub fn commit_failure(&self, origin: OriginId) -> bool {
        let mut inner = self.write();
        if !inner.ledger.mark(origin) {
            return false;
        }
        inner.failed += 1;
        true
    }

    /// The `limit` most recently learned patterns for `language`, oldest first.
    pub fn recent_patterns(&self, language: Language, limit: usize) -> Vec<Pattern> {
        self.read().knowledge.recent(language, limit).to_vec()
    }

    /// A consistent snapshot of what has been learned so far.
    pub fn status(&self) -> LearningStatus {
        let inner = self.read();
        LearningStatus {
            processed_count: inner.ledger.len(),
            failed_count: inner.failed,
            knowledge_size_by_language: inner.knowledge.size_by_language(),
            supported_languages: inner.knowledge.languages(),
        }
    }
}
