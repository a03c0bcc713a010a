//! Fluent construction of workflows.

use std::sync::Arc;

use crate::error::WorkflowError;
use crate::step::Step;

/// Named, ordered list of steps.
#[derive(Clone)]
pub struct Workflow {
    name: String,
    steps: Vec<Arc<dyn Step>>,
}

impl Workflow {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .finish()
    }
}

/// Builder for [`Workflow`].
///
/// # Example
///
/// ```ignore
/// use dbaas_workflow::{CreateVirtualMachine, WorkflowBuilder};
///
/// let workflow = WorkflowBuilder::new("flipperfox_migration")
///     .add_step(CreateVirtualMachine::new(services))
///     .build()?;
/// ```
pub struct WorkflowBuilder {
    name: String,
    steps: Vec<Arc<dyn Step>>,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a shared step.
    pub fn step(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends an owned step.
    pub fn add_step(self, step: impl Step + 'static) -> Self {
        self.step(Arc::new(step))
    }

    /// Finishes the workflow.
    ///
    /// # Returns
    ///
    /// - `Ok(Workflow)` - Steps in the order they were added
    /// - `Err(WorkflowError::EmptyWorkflow)` - If no step was added
    pub fn build(self) -> Result<Workflow, WorkflowError> {
        if self.steps.is_empty() {
            return Err(WorkflowError::EmptyWorkflow);
        }
        Ok(Workflow {
            name: self.name,
            steps: self.steps,
        })
    }
}
