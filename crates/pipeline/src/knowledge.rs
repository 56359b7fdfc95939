//! The Dedup Ledger and the Knowledge Base.
//!
//! Both are plain single-owner containers. Sharing them between tasks is the
//! job of [`crate::LearningState`], which puts them behind a single lock so a
//! merge and its ledger mark are observed together.

use std::collections::{BTreeMap, HashSet};

use crate::{Language, OriginId, Pattern};

/// Set of origins whose samples have been fully processed.
///
/// Grows monotonically: there is no removal and no eviction.
#[derive(Debug, Default, Clone)]
pub struct DedupLedger {
    seen: HashSet<OriginId>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, origin: &OriginId) -> bool {
        self.seen.contains(origin)
    }

    /// Records `origin` as processed. Returns `true` if it was not already
    /// present; marking twice is harmless.
    pub fn mark(&mut self, origin: OriginId) -> bool {
        self.seen.insert(origin)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Learned patterns grouped by language, in learning order.
#[derive(Debug, Default, Clone)]
pub struct KnowledgeBase {
    by_language: BTreeMap<Language, Vec<Pattern>>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `patterns` under `language`, preserving their order.
    pub fn append(&mut self, language: Language, patterns: Vec<Pattern>) {
        if patterns.is_empty() {
            return;
        }
        self.by_language
            .entry(language)
            .or_default()
            .extend(patterns);
    }

    /// All patterns for `language`, oldest first.
    pub fn patterns(&self, language: Language) -> &[Pattern] {
        self.by_language
            .get(&language)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The `limit` most recently learned patterns for `language`, oldest first.
    pub fn recent(&self, language: Language, limit: usize) -> &[Pattern] {
        let all = self.patterns(language);
        &all[all.len().saturating_sub(limit)..]
    }

    pub fn size_by_language(&self) -> BTreeMap<Language, usize> {
        self.by_language
            .iter()
            .map(|(language, patterns)| (*language, patterns.len()))
            .collect()
    }

    /// Languages with at least one pattern, in tag order.
    pub fn languages(&self) -> Vec<Language> {
        self.by_language.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pattern(name: &str) -> Pattern {
        Pattern::new(Language::Python, json!({ "kind": "function", "name": name }))
    }

    #[test]
    fn test_mark_is_idempotent() {
        let mut ledger = DedupLedger::new();
        let origin = OriginId::new("https://example.com/a.py").unwrap();

        assert!(!ledger.has(&origin));
        assert!(ledger.mark(origin.clone()));
        assert!(!ledger.mark(origin.clone()));
        assert!(ledger.has(&origin));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_append_preserves_learning_order() {
        let mut kb = KnowledgeBase::new();
        kb.append(Language::Python, vec![pattern("a"), pattern("b")]);
        kb.append(Language::Python, vec![pattern("c")]);

        let names: Vec<_> = kb
            .patterns(Language::Python)
            .iter()
            .map(|p| p.descriptor["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let mut kb = KnowledgeBase::new();
        kb.append(
            Language::Python,
            vec![pattern("a"), pattern("b"), pattern("c")],
        );

        let recent = kb.recent(Language::Python, 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].descriptor["name"], "b");
        assert_eq!(recent[1].descriptor["name"], "c");
        assert_eq!(kb.recent(Language::Python, 10).len(), 3);
        assert!(kb.recent(Language::JavaScript, 10).is_empty());
    }

    #[test]
    fn test_empty_append_does_not_register_language() {
        let mut kb = KnowledgeBase::new();
        kb.append(Language::JavaScript, Vec::new());
        assert!(kb.languages().is_empty());
        assert!(kb.size_by_language().is_empty());
    }
}
