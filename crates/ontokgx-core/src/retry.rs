//! Attempt, repair once, attempt again.
//!
//! Both engine-driven stages share this policy. The state machine is plain
//! data so the transitions can be exercised without any engine installed.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::engines::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryState {
    Attempt1,
    Repair,
    Attempt2,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, repaired: bool },
    Exhausted { failures: Vec<String> },
}

impl<T> RetryOutcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// A stage that may be retried once after repairing its input.
pub trait RepairableStage {
    type Output;

    fn name(&self) -> &'static str;

    fn attempt(&self, input: &Path) -> Result<Self::Output, EngineError>;

    /// Whether a failed first attempt is worth a repair at all.
    fn should_repair(&self, error: &EngineError) -> bool;

    /// Produces a repaired copy of `input` and returns its path.
    fn repair(&self, input: &Path) -> Result<PathBuf, String>;
}

pub fn run_with_repair<S: RepairableStage>(stage: &S, input: &Path) -> RetryOutcome<S::Output> {
    let mut state = RetryState::Attempt1;
    let mut current = input.to_path_buf();
    let mut failures = Vec::new();

    loop {
        tracing::debug!(stage = stage.name(), ?state, input = %current.display(), "retry step");
        state = match state {
            RetryState::Attempt1 => match stage.attempt(&current) {
                Ok(value) => {
                    return RetryOutcome::Succeeded {
                        value,
                        repaired: false,
                    };
                }
                Err(err) => {
                    tracing::warn!(stage = stage.name(), error = %err, "first attempt failed");
                    let repairable = stage.should_repair(&err);
                    failures.push(err.to_string());
                    if repairable {
                        RetryState::Repair
                    } else {
                        RetryState::Done
                    }
                }
            },
            RetryState::Repair => match stage.repair(&current) {
                Ok(repaired) => {
                    tracing::info!(
                        stage = stage.name(),
                        repaired = %repaired.display(),
                        "repaired input; trying again"
                    );
                    current = repaired;
                    RetryState::Attempt2
                }
                Err(err) => {
                    tracing::warn!(stage = stage.name(), error = %err, "repair failed");
                    failures.push(err);
                    RetryState::Done
                }
            },
            RetryState::Attempt2 => match stage.attempt(&current) {
                Ok(value) => {
                    return RetryOutcome::Succeeded {
                        value,
                        repaired: true,
                    };
                }
                Err(err) => {
                    tracing::warn!(stage = stage.name(), error = %err, "unresolvable failure");
                    failures.push(err.to_string());
                    RetryState::Done
                }
            },
            RetryState::Done => return RetryOutcome::Exhausted { failures },
        };
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct ScriptedStage {
        attempts: RefCell<Vec<Result<u32, EngineError>>>,
        repair: Result<PathBuf, String>,
        repairable_only: bool,
        seen: RefCell<Vec<String>>,
    }

    impl ScriptedStage {
        fn new(attempts: Vec<Result<u32, EngineError>>) -> Self {
            Self {
                attempts: RefCell::new(attempts),
                repair: Ok(PathBuf::from("repaired")),
                repairable_only: false,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl RepairableStage for ScriptedStage {
        type Output = u32;

        fn name(&self) -> &'static str {
            "scripted"
        }

        fn attempt(&self, input: &Path) -> Result<u32, EngineError> {
            self.seen
                .borrow_mut()
                .push(format!("attempt:{}", input.display()));
            self.attempts.borrow_mut().remove(0)
        }

        fn should_repair(&self, error: &EngineError) -> bool {
            !self.repairable_only || error.is_repairable()
        }

        fn repair(&self, input: &Path) -> Result<PathBuf, String> {
            self.seen
                .borrow_mut()
                .push(format!("repair:{}", input.display()));
            self.repair.clone()
        }
    }

    fn failed() -> Result<u32, EngineError> {
        Err(EngineError::Failed("boom".to_string()))
    }

    #[test]
    fn first_success_skips_repair() {
        let stage = ScriptedStage::new(vec![Ok(7)]);
        let outcome = run_with_repair(&stage, Path::new("in"));
        assert_eq!(
            outcome,
            RetryOutcome::Succeeded {
                value: 7,
                repaired: false
            }
        );
        assert_eq!(*stage.seen.borrow(), vec!["attempt:in"]);
    }

    #[test]
    fn failure_then_success_after_repair() {
        let stage = ScriptedStage::new(vec![failed(), Ok(9)]);
        let outcome = run_with_repair(&stage, Path::new("in"));
        assert_eq!(
            outcome,
            RetryOutcome::Succeeded {
                value: 9,
                repaired: true
            }
        );
        assert_eq!(
            *stage.seen.borrow(),
            vec!["attempt:in", "repair:in", "attempt:repaired"]
        );
    }

    #[test]
    fn two_failures_exhaust() {
        let stage = ScriptedStage::new(vec![failed(), failed()]);
        let RetryOutcome::Exhausted { failures } = run_with_repair(&stage, Path::new("in")) else {
            panic!("expected exhausted outcome");
        };
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn unrepairable_error_stops_after_first_attempt() {
        let mut stage = ScriptedStage::new(vec![failed(), Ok(1)]);
        stage.repairable_only = true;
        let outcome = run_with_repair(&stage, Path::new("in"));
        assert!(!outcome.is_success());
        assert_eq!(*stage.seen.borrow(), vec!["attempt:in"]);
    }

    #[test]
    fn failed_repair_skips_second_attempt() {
        let mut stage = ScriptedStage::new(vec![failed(), Ok(1)]);
        stage.repair = Err("cannot repair".to_string());
        let RetryOutcome::Exhausted { failures } = run_with_repair(&stage, Path::new("in")) else {
            panic!("expected exhausted outcome");
        };
        assert_eq!(failures, vec!["engine failed: boom", "cannot repair"]);
        assert_eq!(*stage.seen.borrow(), vec!["attempt:in", "repair:in"]);
    }
}
