//! Run-scoped state shared by every step of one workflow run.

use dbaas_core::{DatabaseInfra, Environment, Host, Instance, Offering, Plan};
use serde::Serialize;
use std::error::Error;
use uuid::Uuid;

use crate::error::{ErrorCode, WorkflowError};

/// Append-only record of step errors, surfaced to the caller after a
/// failed run.
///
/// `error_codes[i]` and `tracebacks[i]` describe the same failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExceptionLog {
    error_codes: Vec<ErrorCode>,
    tracebacks: Vec<String>,
}

impl ExceptionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one `(code, trace)` pair.
    pub fn record(&mut self, code: ErrorCode, trace: impl Into<String>) {
        self.error_codes.push(code);
        self.tracebacks.push(trace.into());
    }

    /// Appends `error` with a trace rendered from its source chain.
    pub fn record_error(&mut self, code: ErrorCode, step: &str, error: &(dyn Error + 'static)) {
        self.record(code, render_trace(step, error));
    }

    pub fn error_codes(&self) -> &[ErrorCode] {
        &self.error_codes
    }

    pub fn tracebacks(&self) -> &[String] {
        &self.tracebacks
    }

    pub fn len(&self) -> usize {
        self.error_codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.error_codes.is_empty()
    }

    /// Iterates `(code, trace)` pairs in the order they were recorded.
    pub fn entries(&self) -> impl Iterator<Item = (ErrorCode, &str)> {
        self.error_codes
            .iter()
            .copied()
            .zip(self.tracebacks.iter().map(String::as_str))
    }
}

/// Renders an error and its whole `source()` chain, outermost first.
pub fn render_trace(step: &str, error: &(dyn Error + 'static)) -> String {
    let mut trace = format!("step {} failed: {}", step, error);
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push_str("\n  caused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }
    trace
}

/// Typed state threaded through one workflow run.
///
/// Callers seed the source side; steps grow `target_hosts` and
/// `target_instances` as resources are created. For every index already
/// processed, `target_hosts[i]`/`target_instances[i]` replace
/// `source_hosts[i]`/`source_instances[i]`, so a partially processed run
/// has shorter target lists than source lists.
#[derive(Clone, Debug)]
pub struct WorkflowContext {
    /// Identifier of this run, used in log spans
    pub run_id: Uuid,
    pub environment: Environment,
    pub target_plan: Plan,
    pub offering: Offering,
    pub source_instances: Vec<Instance>,
    /// Index-aligned with `source_instances`
    pub source_hosts: Vec<Host>,
    pub target_hosts: Vec<Host>,
    pub target_instances: Vec<Instance>,
    pub databaseinfra: DatabaseInfra,
    pub exceptions: ExceptionLog,
}

impl WorkflowContext {
    /// Creates a context with no sources and empty target lists.
    pub fn new(
        environment: Environment,
        target_plan: Plan,
        offering: Offering,
        databaseinfra: DatabaseInfra,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            environment,
            target_plan,
            offering,
            source_instances: Vec::new(),
            source_hosts: Vec::new(),
            target_hosts: Vec::new(),
            target_instances: Vec::new(),
            databaseinfra,
            exceptions: ExceptionLog::new(),
        }
    }

    /// Seeds the source side of a migration.
    ///
    /// # Arguments
    ///
    /// * `instances` - Instances being replaced, in processing order
    /// * `hosts` - Host of each instance, at the same index
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - Context with sources set
    /// - `Err(WorkflowError::MisalignedSources)` - If the lengths differ
    pub fn with_sources(
        mut self,
        instances: Vec<Instance>,
        hosts: Vec<Host>,
    ) -> Result<Self, WorkflowError> {
        if instances.len() != hosts.len() {
            return Err(WorkflowError::MisalignedSources {
                instances: instances.len(),
                hosts: hosts.len(),
            });
        }
        self.source_instances = instances;
        self.source_hosts = hosts;
        Ok(self)
    }

    /// Number of source entries that already have a replacement.
    pub fn processed(&self) -> usize {
        self.target_instances.len()
    }
}
