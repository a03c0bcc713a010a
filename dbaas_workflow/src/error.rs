//! Error types and error codes for workflow execution.

use dbaas_core::{BundleScope, CredentialError, DbaasError, ProviderError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable code reported to callers for a failed step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Virtual machine creation (or its compensation) failed.
pub const DBAAS_0020: ErrorCode = ErrorCode::new("DBAAS_0020");

/// Errors for building or seeding a workflow.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Workflow has no steps
    #[error("Workflow cannot be empty")]
    EmptyWorkflow,

    /// Source instances and source hosts are not index-aligned
    #[error("Got {instances} source instances but {hosts} source hosts")]
    MisalignedSources { instances: usize, hosts: usize },
}

/// Bundle allocation failures.
#[derive(Error, Debug)]
pub enum AllocationError {
    /// Plan has no active bundle to place a VM in
    #[error("No active bundles available")]
    NoActiveBundles,

    /// Concurrent runs kept moving the last-used pointer
    #[error("Could not advance last used bundle for {scope} after {attempts} attempts")]
    Contention { scope: BundleScope, attempts: u32 },

    /// Store access failed
    #[error(transparent)]
    Store(#[from] DbaasError),
}

/// Error returned by a step's forward or compensating action.
///
/// The engine turns it into an error code plus a trace in the context;
/// it never reaches the caller of the engine.
#[derive(Error, Debug)]
pub enum StepError {
    /// Store, precondition or configuration failure
    #[error(transparent)]
    Core(#[from] DbaasError),

    /// Credentials could not be resolved
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// No bundle could be chosen
    #[error("Bundle allocation failed")]
    Allocation(#[from] AllocationError),

    /// Provider accepted the deployment but returned no VM
    #[error("CloudStack could not create the virtual machine {0}")]
    NoVirtualMachine(String),

    /// Provider refused to destroy a VM during compensation
    #[error("CloudStack refused to destroy virtual machine {0}")]
    DestroyRefused(String),

    /// Target host has no provider metadata, so its VM cannot be destroyed
    #[error("Host {0} has no provider metadata, its virtual machine was not destroyed")]
    MissingProviderMetadata(String),

    /// Context lacks data the step relies on
    #[error("Workflow context is missing {0}")]
    MissingContext(String),

    /// Generic error wrapper
    #[error("Step error: {0}")]
    Other(#[from] anyhow::Error),
}
