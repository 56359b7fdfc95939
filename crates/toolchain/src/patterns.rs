//! A pattern oracle that extracts structural patterns with regular
//! expressions.
//!
//! Recognises imports, function definitions and class definitions in Python
//! and JavaScript. Each pattern's descriptor is
//! `{ "kind": "import" | "function" | "class", "name": <identifier or module> }`
//! and patterns are returned in source order.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pipeline::{Language, OracleError, OracleKind, Pattern, PatternOracle};
use regex::Regex;
use serde_json::json;

struct Rule {
    kind: &'static str,
    regex: Regex,
}

fn rule(kind: &'static str, pattern: &str) -> Rule {
    Rule {
        kind,
        regex: Regex::new(pattern).expect("structural pattern regex"),
    }
}

static PYTHON_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("import", r"(?m)^\s*import\s+([A-Za-z_][\w.]*)"),
        rule("import", r"(?m)^\s*from\s+([A-Za-z_.][\w.]*)\s+import\b"),
        rule("function", r"(?m)^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\("),
        rule("class", r"(?m)^\s*class\s+([A-Za-z_]\w*)"),
    ]
});

static JAVASCRIPT_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule("import", r#"(?m)^\s*import\s+(?:[^'";]+?\s+from\s+)?['"]([^'"]+)['"]"#),
        rule("import", r#"\brequire\(\s*['"]([^'"]+)['"]\s*\)"#),
        rule(
            "function",
            r"(?m)^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(",
        ),
        rule(
            "function",
            r"(?m)^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
        ),
        rule(
            "class",
            r"(?m)^\s*(?:export\s+)?(?:default\s+)?class\s+([A-Za-z_$][\w$]*)",
        ),
    ]
});

/// Regex-based [`PatternOracle`] for Python and JavaScript.
///
/// [`Language::Other`] samples yield no patterns. Empty samples are an
/// error so they are recorded as failed rather than silently learned.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralPatternExtractor;

impl StructuralPatternExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts patterns synchronously.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] if `code` is blank.
    pub fn extract_sync(&self, code: &str, language: Language) -> Result<Vec<Pattern>, OracleError> {
        if code.trim().is_empty() {
            return Err(OracleError::failed(OracleKind::Pattern, "sample is empty"));
        }
        let rules: &[Rule] = match language {
            Language::Python => &PYTHON_RULES,
            Language::JavaScript => &JAVASCRIPT_RULES,
            Language::Other => return Ok(Vec::new()),
        };

        let mut found: Vec<(usize, &'static str, &str)> = Vec::new();
        for rule in rules {
            for captures in rule.regex.captures_iter(code) {
                if let Some(name) = captures.get(1) {
                    found.push((name.start(), rule.kind, name.as_str()));
                }
            }
        }
        found.sort_by_key(|(offset, _, _)| *offset);

        Ok(found
            .into_iter()
            .map(|(_, kind, name)| Pattern::new(language, json!({ "kind": kind, "name": name })))
            .collect())
    }
}

#[async_trait]
impl PatternOracle for StructuralPatternExtractor {
    async fn extract(&self, code: &str, language: Language) -> Result<Vec<Pattern>, OracleError> {
        self.extract_sync(code, language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(patterns: &[Pattern]) -> Vec<(String, String)> {
        patterns
            .iter()
            .map(|p| {
                (
                    p.descriptor["kind"].as_str().unwrap().to_string(),
                    p.descriptor["name"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, n)| (k.to_string(), n.to_string()))
            .collect()
    }

    #[test]
    fn test_python_patterns_in_source_order() {
        let code = "\
import os
from collections import OrderedDict

class Cache:
    def get(self, key):
        return None

async def fetch(url):
    pass
";
        let patterns = StructuralPatternExtractor
            .extract_sync(code, Language::Python)
            .unwrap();

        assert_eq!(
            summary(&patterns),
            pairs(&[
                ("import", "os"),
                ("import", "collections"),
                ("class", "Cache"),
                ("function", "get"),
                ("function", "fetch"),
            ])
        );
        assert!(patterns.iter().all(|p| p.language == Language::Python));
    }

    #[test]
    fn test_javascript_patterns_in_source_order() {
        let code = r#"import React from 'react';
const fs = require("fs");

export default class App {}

export async function load(path) {
  return fs.readFileSync(path);
}

const double = (x) => x * 2;
"#;
        let patterns = StructuralPatternExtractor
            .extract_sync(code, Language::JavaScript)
            .unwrap();

        assert_eq!(
            summary(&patterns),
            pairs(&[
                ("import", "react"),
                ("import", "fs"),
                ("class", "App"),
                ("function", "load"),
                ("function", "double"),
            ])
        );
    }

    #[test]
    fn test_other_language_yields_nothing() {
        let patterns = StructuralPatternExtractor
            .extract_sync("fn main() {}", Language::Other)
            .unwrap();
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_blank_sample_is_an_error() {
        let err = StructuralPatternExtractor
            .extract_sync("  \n\t", Language::Python)
            .unwrap_err();
        assert_eq!(err.oracle(), OracleKind::Pattern);
    }
}
