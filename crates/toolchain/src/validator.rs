//! A validation oracle that syntax-checks candidates with the language's own
//! interpreter.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use pipeline::{Language, OracleError, OracleKind, ValidationOracle, Verdict};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

/// Stand-in for the scratch file path in reported diagnostics.
const CANDIDATE_PLACEHOLDER: &str = "<candidate>";

const PYTHON_CHECK: [&str; 2] = ["-m", "py_compile"];
const NODE_CHECK: [&str; 1] = ["--check"];

/// Interpreter executables used for checking. Resolved through `PATH` unless
/// absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interpreters {
    pub python: String,
    pub node: String,
}

impl Default for Interpreters {
    fn default() -> Self {
        Self {
            python: "python3".into(),
            node: "node".into(),
        }
    }
}

/// Syntax-checks Python with `python3 -m py_compile` and JavaScript with
/// `node --check`.
///
/// A candidate passes when the checker exits successfully. Otherwise every
/// non-empty stderr line becomes a diagnostic. [`Language::Other`] candidates
/// always pass because there is nothing to check them with; blank candidates
/// always fail.
#[derive(Debug, Clone, Default)]
pub struct InterpreterValidator {
    interpreters: Interpreters,
}

impl InterpreterValidator {
    pub fn new(interpreters: Interpreters) -> Self {
        Self { interpreters }
    }

    async fn check(&self, code: &str, language: Language) -> Result<Verdict, OracleError> {
        let (program, args, extension): (&str, &[&str], &str) = match language {
            Language::Python => (self.interpreters.python.as_str(), &PYTHON_CHECK[..], "py"),
            Language::JavaScript => (
                self.interpreters.node.as_str(),
                &NODE_CHECK[..],
                javascript_extension(code),
            ),
            Language::Other => return Ok(Verdict::pass()),
        };

        // A private directory keeps interpreter byproducts (e.g. __pycache__)
        // out of the shared temp dir and is removed on drop.
        let scratch = tempfile::tempdir().map_err(|e| {
            OracleError::failed(OracleKind::Validation, format!("cannot create scratch dir: {e}"))
        })?;
        let path = scratch.path().join(format!("candidate.{extension}"));
        tokio::fs::write(&path, code).await.map_err(|e| {
            OracleError::failed(OracleKind::Validation, format!("cannot write candidate: {e}"))
        })?;

        let output = Command::new(program)
            .args(args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                OracleError::failed(OracleKind::Validation, format!("cannot run '{program}': {e}"))
            })?;

        if output.status.success() {
            return Ok(Verdict::pass());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut diagnostics = diagnostics_from(&stderr, &path);
        if diagnostics.is_empty() {
            diagnostics.push(format!("'{program}' rejected the candidate ({})", output.status));
        }
        debug!(%language, diagnostics = diagnostics.len(), "Candidate rejected");
        Ok(Verdict::fail(diagnostics))
    }
}

#[async_trait]
impl ValidationOracle for InterpreterValidator {
    async fn validate(&self, code: &str, language: Language) -> Result<Verdict, OracleError> {
        if code.trim().is_empty() {
            return Ok(Verdict::fail(vec!["candidate is empty".into()]));
        }
        self.check(code, language).await
    }
}

/// ES module syntax is only accepted by `node --check` in `.mjs` files.
fn javascript_extension(code: &str) -> &'static str {
    let is_module = code.lines().map(str::trim_start).any(|line| {
        line.starts_with("import ") || line.starts_with("import{") || line.starts_with("export ")
    });
    if is_module {
        "mjs"
    } else {
        "js"
    }
}

fn diagnostics_from(stderr: &str, path: &Path) -> Vec<String> {
    let path = path.display().to_string();
    stderr
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.replace(&path, CANDIDATE_PLACEHOLDER))
        .collect()
}
