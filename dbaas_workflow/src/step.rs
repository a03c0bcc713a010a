//! Reversible workflow steps.
//!
//! A step pairs a forward action with a compensating action. The engine
//! awaits `execute` for each step in order and, after a failure, awaits
//! `undo` for the steps that completed, last first.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::context::WorkflowContext;
use crate::error::{ErrorCode, StepError};

/// Lifecycle of one step within a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepState {
    #[default]
    NotStarted,
    Running,
    Succeeded,
    Failed,
    /// Compensated after a later failure
    Undone,
    /// Compensation was attempted and failed
    UndoFailed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepState::NotStarted => "not started",
            StepState::Running => "running",
            StepState::Succeeded => "succeeded",
            StepState::Failed => "failed",
            StepState::Undone => "undone",
            StepState::UndoFailed => "undo failed",
        };
        write!(f, "{}", label)
    }
}

/// Reversible unit of work.
///
/// Implementations report failure through `Err`; the engine records the
/// error under [`Step::error_code`] in the context's exception log.
/// `undo` must tolerate being called on a partially completed `execute`.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use dbaas_workflow::{ErrorCode, Step, StepError, WorkflowContext};
///
/// struct Noop;
///
/// #[async_trait]
/// impl Step for Noop {
///     fn name(&self) -> &str {
///         "noop"
///     }
///
///     fn error_code(&self) -> ErrorCode {
///         ErrorCode::new("NOOP")
///     }
///
///     async fn execute(&self, _context: &mut WorkflowContext) -> Result<(), StepError> {
///         Ok(())
///     }
///
///     async fn undo(&self, _context: &mut WorkflowContext) -> Result<(), StepError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Step: Send + Sync {
    /// Short identifier used in logs and results.
    fn name(&self) -> &str;

    /// Human-readable summary of what the step does.
    fn description(&self) -> &str {
        self.name()
    }

    /// Code recorded when `execute` or `undo` fails.
    fn error_code(&self) -> ErrorCode;

    /// Forward action.
    async fn execute(&self, context: &mut WorkflowContext) -> Result<(), StepError>;

    /// Compensating action.
    async fn undo(&self, context: &mut WorkflowContext) -> Result<(), StepError>;
}

type StepFn = Arc<dyn Fn(&mut WorkflowContext) -> Result<(), StepError> + Send + Sync>;

fn no_undo(_context: &mut WorkflowContext) -> Result<(), StepError> {
    Ok(())
}

/// Step built from two closures.
///
/// Useful for context-only bookkeeping that needs no I/O. The undo
/// closure defaults to a no-op.
#[derive(Clone)]
pub struct FunctionStep {
    name: String,
    error_code: ErrorCode,
    execute_fn: StepFn,
    undo_fn: StepFn,
}

impl FunctionStep {
    /// Creates a step whose forward action is `execute_fn`.
    pub fn new<F>(name: impl Into<String>, error_code: ErrorCode, execute_fn: F) -> Self
    where
        F: Fn(&mut WorkflowContext) -> Result<(), StepError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            error_code,
            execute_fn: Arc::new(execute_fn),
            undo_fn: Arc::new(no_undo),
        }
    }

    /// Sets the compensating action.
    pub fn with_undo<F>(mut self, undo_fn: F) -> Self
    where
        F: Fn(&mut WorkflowContext) -> Result<(), StepError> + Send + Sync + 'static,
    {
        self.undo_fn = Arc::new(undo_fn);
        self
    }
}

impl fmt::Debug for FunctionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionStep")
            .field("name", &self.name)
            .field("error_code", &self.error_code)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Step for FunctionStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    async fn execute(&self, context: &mut WorkflowContext) -> Result<(), StepError> {
        (self.execute_fn)(context)
    }

    async fn undo(&self, context: &mut WorkflowContext) -> Result<(), StepError> {
        (self.undo_fn)(context)
    }
}
