//! The bounded-retry repair protocol as an explicit state machine.
//!
//! ```text
//! Generated --Submit--> Validating{0}
//! Validating{i} --Verdict(pass)--> Passed{i}
//! Validating{i} --Verdict(fail), i < R--> Retrying{i}
//! Validating{i} --Verdict(fail), i = R--> Exhausted{R + 1}
//! Retrying{i} --Revised--> Validating{i + 1}
//! ```
//!
//! The machine holds nothing but an attempt counter and makes no choices of
//! its own: the oracle verdicts are its only input. Every path reaches a
//! terminal state after at most `R + 1` verdicts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a repair loop currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RepairState {
    /// An initial candidate exists but has not been submitted yet.
    Generated,
    /// Candidate `attempt` is with the validation oracle.
    Validating { attempt: u32 },
    /// Candidate `attempt` failed; a revision is being generated.
    Retrying { attempt: u32 },
    /// Candidate `attempt` passed. Terminal.
    Passed { attempt: u32 },
    /// Every one of `attempts` candidates failed. Terminal.
    Exhausted { attempts: u32 },
}

impl RepairState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed { .. } | Self::Exhausted { .. })
    }
}

/// Inputs that move a [`RepairState`] forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RepairEvent {
    /// The current candidate is handed to the validation oracle.
    Submit,
    /// The validation oracle answered.
    Verdict { passed: bool },
    /// A revised candidate is ready.
    Revised,
}

/// An event arrived in a state that does not accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event {event:?} is not valid in state {from:?}")]
pub struct InvalidTransition {
    pub from: RepairState,
    pub event: RepairEvent,
}

/// Applies `event` to `state` under a retry budget of `max_retries`.
///
/// # Errors
///
/// Returns [`InvalidTransition`] for any pair not in the table above,
/// including every event delivered to a terminal state.
pub fn transition(
    state: RepairState,
    event: RepairEvent,
    max_retries: u32,
) -> Result<RepairState, InvalidTransition> {
    let next = match (state, event) {
        (RepairState::Generated, RepairEvent::Submit) => RepairState::Validating { attempt: 0 },
        (RepairState::Validating { attempt }, RepairEvent::Verdict { passed: true }) => {
            RepairState::Passed { attempt }
        }
        (RepairState::Validating { attempt }, RepairEvent::Verdict { passed: false }) => {
            if attempt < max_retries {
                RepairState::Retrying { attempt }
            } else {
                RepairState::Exhausted {
                    attempts: attempt + 1,
                }
            }
        }
        (RepairState::Retrying { attempt }, RepairEvent::Revised) => RepairState::Validating {
            attempt: attempt + 1,
        },
        (from, event) => return Err(InvalidTransition { from, event }),
    };
    Ok(next)
}

/// A [`RepairState`] paired with its retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairMachine {
    state: RepairState,
    max_retries: u32,
}

impl RepairMachine {
    /// Starts a machine in [`RepairState::Generated`].
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: RepairState::Generated,
            max_retries,
        }
    }

    pub fn state(&self) -> RepairState {
        self.state
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Applies `event` and returns the new state. On error the machine is
    /// left unchanged.
    pub fn apply(&mut self, event: RepairEvent) -> Result<RepairState, InvalidTransition> {
        self.state = transition(self.state, event, self.max_retries)?;
        Ok(self.state)
    }
}

/// Record of one validation attempt. Lives only as long as its repair loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairAttempt {
    /// Zero-based attempt index.
    pub index: u32,
    /// The candidate that was validated.
    pub code: String,
    /// Diagnostics reported for `code`.
    pub diagnostics: Vec<String>,
    /// Whether `code` passed.
    pub passed: bool,
}
