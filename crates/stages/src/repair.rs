//! Drives the repair state machine against the validation and generation
//! oracles.
//!
//! Oracle errors never abort the loop. A validation error or timeout counts
//! as a failed attempt whose diagnostics carry the error text. A revision
//! error keeps the previous candidate for the next attempt. Either way the
//! attempt is consumed, so a request never makes more than `R + 1`
//! validation calls.

use std::time::Duration;

use pipeline::{
    GenerationFailure, GenerationOracle, GenerationRequest, OracleKind, RepairAttempt,
    RepairContext, RepairEvent, RepairMachine, RepairState, ValidationOracle, Verdict,
};
use tracing::{debug, info, warn};

use crate::bounded;

/// A candidate that passed validation, with the attempts that led to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    /// The passing code.
    pub code: String,
    /// Every validation attempt in order; the last one passed.
    pub attempts: Vec<RepairAttempt>,
}

impl RepairReport {
    /// Number of validation oracle calls made.
    pub fn validation_calls(&self) -> usize {
        self.attempts.len()
    }
}

/// One repair loop instance. Borrowed oracles, no shared mutable state.
pub struct RepairLoop<'a> {
    generation: &'a dyn GenerationOracle,
    validation: &'a dyn ValidationOracle,
    max_retries: u32,
    oracle_timeout: Duration,
}

impl<'a> RepairLoop<'a> {
    pub fn new(
        generation: &'a dyn GenerationOracle,
        validation: &'a dyn ValidationOracle,
        max_retries: u32,
        oracle_timeout: Duration,
    ) -> Self {
        Self {
            generation,
            validation,
            max_retries,
            oracle_timeout,
        }
    }

    /// Validates `initial` and revises it until it passes or the retry
    /// budget is spent.
    ///
    /// `request` is the request that produced `initial`; revisions reuse its
    /// prompt, language and known patterns with a [`RepairContext`] attached.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationFailure::Exhausted`] with the last candidate and
    /// its diagnostics when no candidate passed.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        initial: String,
    ) -> Result<RepairReport, GenerationFailure> {
        let mut machine = RepairMachine::new(self.max_retries);
        let mut attempts: Vec<RepairAttempt> = Vec::new();
        let mut candidate = initial;

        advance(&mut machine, RepairEvent::Submit);
        loop {
            let index = attempts.len() as u32;
            let verdict = self.validate(&candidate, request).await;
            attempts.push(RepairAttempt {
                index,
                code: candidate.clone(),
                diagnostics: verdict.diagnostics.clone(),
                passed: verdict.passed,
            });

            match advance(
                &mut machine,
                RepairEvent::Verdict {
                    passed: verdict.passed,
                },
            ) {
                RepairState::Passed { attempt } => {
                    info!(attempt, "Candidate passed validation");
                    return Ok(RepairReport {
                        code: candidate,
                        attempts,
                    });
                }
                RepairState::Exhausted { attempts: calls } => {
                    warn!(
                        validation_calls = calls,
                        diagnostics = verdict.diagnostics.len(),
                        "Repair retries exhausted"
                    );
                    return Err(GenerationFailure::Exhausted {
                        validation_calls: calls,
                        last_code: candidate,
                        last_diagnostics: verdict.diagnostics,
                    });
                }
                RepairState::Retrying { attempt } => {
                    debug!(
                        attempt,
                        diagnostics = ?verdict.diagnostics,
                        "Candidate failed validation; requesting revision"
                    );
                    candidate = self
                        .revise(request, attempt, candidate, verdict.diagnostics)
                        .await;
                    advance(&mut machine, RepairEvent::Revised);
                }
                RepairState::Generated | RepairState::Validating { .. } => {
                    unreachable!("a verdict always leaves the validating state")
                }
            }
        }
    }

    async fn validate(&self, code: &str, request: &GenerationRequest) -> Verdict {
        let call = self.validation.validate(code, request.language);
        let result = bounded(self.oracle_timeout, OracleKind::Validation, call).await;
        match result {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, "Validation oracle failed; counting attempt as failed");
                Verdict::fail(vec![e.to_string()])
            }
        }
    }

    async fn revise(
        &self,
        request: &GenerationRequest,
        attempt: u32,
        previous: String,
        diagnostics: Vec<String>,
    ) -> String {
        let revision = GenerationRequest {
            repair: Some(RepairContext {
                attempt,
                previous_code: previous.clone(),
                diagnostics,
            }),
            ..request.clone()
        };
        let call = self.generation.generate(&revision);
        let result = bounded(self.oracle_timeout, OracleKind::Generation, call).await;
        match result {
            Ok(code) => code,
            Err(e) => {
                warn!(attempt, error = %e, "Revision failed; retrying previous candidate");
                previous
            }
        }
    }
}

// Each call site delivers the one event its current state accepts.
fn advance(machine: &mut RepairMachine, event: RepairEvent) -> RepairState {
    machine
        .apply(event)
        .unwrap_or_else(|e| unreachable!("repair loop out of step: {e}"))
}
