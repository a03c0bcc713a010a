//! Compensation of completed steps after a failure.
//!
//! Rollback is best effort: every eligible step is undone in reverse
//! order, and a failing `undo` is recorded without stopping the ones
//! before it.
//!
//! # Rollback Policies
//!
//! - `CompletedOnly`: undo only steps whose `execute` succeeded (default)
//! - `IncludeFailed`: also undo the step whose `execute` failed, for steps
//!   that leave partial work behind

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::WorkflowContext;
use crate::step::{Step, StepState};

/// Which steps are compensated after a failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollbackPolicy {
    #[default]
    CompletedOnly,
    IncludeFailed,
}

impl RollbackPolicy {
    fn covers(self, state: StepState) -> bool {
        match state {
            StepState::Succeeded => true,
            StepState::Failed => self == RollbackPolicy::IncludeFailed,
            _ => false,
        }
    }
}

/// Outcome of one rollback pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport {
    /// Steps whose `undo` succeeded, in the order they were undone
    pub rolled_back_steps: Vec<String>,
    /// Steps whose `undo` failed, with the error message
    pub failed_compensations: Vec<(String, String)>,
}

impl RollbackReport {
    /// True when every attempted compensation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed_compensations.is_empty()
    }

    /// Number of compensations attempted.
    pub fn attempted(&self) -> usize {
        self.rolled_back_steps.len() + self.failed_compensations.len()
    }
}

/// Runs `undo` over a run's steps in reverse order.
#[derive(Clone, Copy, Debug, Default)]
pub struct RollbackEngine {
    policy: RollbackPolicy,
}

impl RollbackEngine {
    pub fn new(policy: RollbackPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RollbackPolicy {
        self.policy
    }

    /// Undoes every step the policy covers, last first.
    ///
    /// # Arguments
    ///
    /// * `steps` - Steps of the run, in execution order
    /// * `states` - State of each step, index-aligned with `steps`
    /// * `context` - Run context; undo errors are appended to its exception log
    ///
    /// # Returns
    ///
    /// Report of the compensations attempted. `states` is updated to
    /// `Undone` or `UndoFailed` for each of them.
    pub async fn execute_rollback(
        &self,
        steps: &[Arc<dyn Step>],
        states: &mut [StepState],
        context: &mut WorkflowContext,
    ) -> RollbackReport {
        let mut report = RollbackReport::default();

        for (step, state) in steps.iter().zip(states.iter_mut()).rev() {
            if !self.policy.covers(*state) {
                continue;
            }

            tracing::info!("Running undo for step {}", step.name());
            match step.undo(context).await {
                Ok(()) => {
                    *state = StepState::Undone;
                    report.rolled_back_steps.push(step.name().to_string());
                }
                Err(e) => {
                    tracing::warn!("Undo of step {} failed: {}", step.name(), e);
                    context
                        .exceptions
                        .record_error(step.error_code(), step.name(), &e);
                    *state = StepState::UndoFailed;
                    report
                        .failed_compensations
                        .push((step.name().to_string(), e.to_string()));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_coverage() {
        assert!(RollbackPolicy::CompletedOnly.covers(StepState::Succeeded));
        assert!(!RollbackPolicy::CompletedOnly.covers(StepState::Failed));
        assert!(RollbackPolicy::IncludeFailed.covers(StepState::Failed));
        assert!(!RollbackPolicy::IncludeFailed.covers(StepState::NotStarted));
        assert!(!RollbackPolicy::IncludeFailed.covers(StepState::Undone));
    }

    #[test]
    fn test_report_counts() {
        let report = RollbackReport {
            rolled_back_steps: vec!["a".to_string()],
            failed_compensations: vec![("b".to_string(), "boom".to_string())],
        };
        assert!(!report.is_clean());
        assert_eq!(report.attempted(), 2);
        assert!(RollbackReport::default().is_clean());
    }
}
