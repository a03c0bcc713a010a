//! Sequential workflow execution with reverse-order compensation.
//!
//! The engine awaits each step's `execute` in order. The first failure
//! stops forward progress, is recorded in the context's exception log,
//! and triggers a rollback of the steps that completed. A run either
//! succeeds as a whole or reports failure; there is no partial success.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;

use crate::builder::Workflow;
use crate::context::WorkflowContext;
use crate::error::ErrorCode;
use crate::rollback::{RollbackEngine, RollbackPolicy, RollbackReport};
use crate::step::{Step, StepState};

/// Result of one workflow run.
#[derive(Clone, Debug, Serialize)]
pub struct WorkflowResult {
    /// Workflow name
    pub workflow: String,
    /// True when every step's `execute` succeeded
    pub success: bool,
    /// Steps whose `execute` succeeded, in execution order
    pub completed_steps: Vec<String>,
    /// Step whose `execute` failed, if any
    pub failed_step: Option<String>,
    /// Error codes recorded during the run, in order
    pub error_codes: Vec<ErrorCode>,
    /// Traces, index-aligned with `error_codes`
    pub tracebacks: Vec<String>,
    /// Present when a rollback ran
    pub rollback_report: Option<RollbackReport>,
    /// Final state of every step, in execution order
    pub step_states: Vec<(String, StepState)>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl WorkflowResult {
    /// Final state of the named step.
    pub fn state_of(&self, step: &str) -> Option<StepState> {
        self.step_states
            .iter()
            .find(|(name, _)| name == step)
            .map(|(_, state)| *state)
    }

    /// Serializes the result for job records.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Runs workflows against a context.
///
/// # Example
///
/// ```ignore
/// use dbaas_workflow::{RollbackPolicy, WorkflowEngine};
///
/// let engine = WorkflowEngine::new().with_rollback_policy(RollbackPolicy::IncludeFailed);
/// let result = engine.execute(&workflow, &mut context).await;
/// if !result.success {
///     for (code, trace) in result.error_codes.iter().zip(&result.tracebacks) {
///         eprintln!("{}: {}", code, trace);
///     }
/// }
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkflowEngine {
    rollback: RollbackEngine,
}

impl WorkflowEngine {
    /// Creates an engine that compensates completed steps only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rollback_policy(mut self, policy: RollbackPolicy) -> Self {
        self.rollback = RollbackEngine::new(policy);
        self
    }

    pub fn rollback_policy(&self) -> RollbackPolicy {
        self.rollback.policy()
    }

    /// Executes `workflow` against `context`.
    ///
    /// Never returns an error: step failures, including failed undos, end
    /// up in `context.exceptions` and in the returned result.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        context: &mut WorkflowContext,
    ) -> WorkflowResult {
        let span = tracing::info_span!(
            "workflow",
            name = %workflow.name(),
            run_id = %context.run_id
        );
        self.run(workflow, context).instrument(span).await
    }

    async fn run(&self, workflow: &Workflow, context: &mut WorkflowContext) -> WorkflowResult {
        let started_at = Utc::now();
        let steps = workflow.steps();
        let mut states = vec![StepState::NotStarted; steps.len()];
        let mut completed_steps = Vec::new();
        let mut failed_step = None;

        tracing::info!("Starting workflow with {} steps", steps.len());

        for (index, step) in steps.iter().enumerate() {
            tracing::info!("Running step {}: {}", step.name(), step.description());
            states[index] = StepState::Running;

            match step.execute(context).await {
                Ok(()) => {
                    states[index] = StepState::Succeeded;
                    completed_steps.push(step.name().to_string());
                    tracing::info!("Step {} completed", step.name());
                }
                Err(e) => {
                    tracing::warn!("Step {} failed: {}", step.name(), e);
                    context
                        .exceptions
                        .record_error(step.error_code(), step.name(), &e);
                    states[index] = StepState::Failed;
                    failed_step = Some(step.name().to_string());
                    break;
                }
            }
        }

        let rollback_report = if failed_step.is_some() {
            let report = self
                .rollback
                .execute_rollback(steps, &mut states, context)
                .await;
            if report.is_clean() {
                tracing::info!("Rolled back {} steps", report.rolled_back_steps.len());
            } else {
                tracing::warn!(
                    "Rollback left {} failed compensations",
                    report.failed_compensations.len()
                );
            }
            Some(report)
        } else {
            tracing::info!("Workflow completed");
            None
        };

        WorkflowResult {
            workflow: workflow.name().to_string(),
            success: failed_step.is_none(),
            completed_steps,
            failed_step,
            error_codes: context.exceptions.error_codes().to_vec(),
            tracebacks: context.exceptions.tracebacks().to_vec(),
            rollback_report,
            step_states: steps
                .iter()
                .map(|s| s.name().to_string())
                .zip(states)
                .collect(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Undoes `steps` in reverse order on the caller's behalf.
    ///
    /// Every step is treated as completed. Failures are recorded in the
    /// context and do not stop the remaining compensations.
    pub async fn compensate(
        &self,
        steps: &[Arc<dyn Step>],
        context: &mut WorkflowContext,
    ) -> RollbackReport {
        let span = tracing::info_span!("compensate", run_id = %context.run_id);
        let mut states = vec![StepState::Succeeded; steps.len()];
        self.rollback
            .execute_rollback(steps, &mut states, context)
            .instrument(span)
            .await
    }
}
