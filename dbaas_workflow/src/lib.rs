//! DBaaS workflow layer - reversible provisioning steps.
//!
//! This crate runs ordered lists of reversible steps against a typed
//! context:
//!
//! - Execution: each step's forward action is awaited in order
//! - Failure: the first error stops the run and is recorded with its code
//! - Rollback: completed steps are undone last first, best effort
//!
//! The concrete [`CreateVirtualMachine`] step deploys replacement VMs across
//! a plan's bundles using the [`BundleAllocator`] rotation.
//!
//! # Example
//!
//! ```ignore
//! use dbaas_workflow::{CreateVirtualMachine, WorkflowBuilder, WorkflowContext, WorkflowEngine};
//!
//! let workflow = WorkflowBuilder::new("flipperfox_migration")
//!     .add_step(CreateVirtualMachine::new(services))
//!     .build()?;
//!
//! let mut context = WorkflowContext::new(environment, plan, offering, infra)
//!     .with_sources(instances, hosts)?;
//! let result = WorkflowEngine::new().execute(&workflow, &mut context).await;
//! ```

pub mod allocator;
pub mod builder;
pub mod context;
pub mod engine;
pub mod error;
pub mod rollback;
pub mod services;
pub mod step;
pub mod steps;

pub use allocator::{avoid_source_network, get_next_bundle, BundleAllocator};
pub use builder::{Workflow, WorkflowBuilder};
pub use context::{render_trace, ExceptionLog, WorkflowContext};
pub use engine::{WorkflowEngine, WorkflowResult};
pub use error::{AllocationError, ErrorCode, StepError, WorkflowError, DBAAS_0020};
pub use rollback::{RollbackEngine, RollbackPolicy, RollbackReport};
pub use services::WorkflowServices;
pub use step::{FunctionStep, Step, StepState};
pub use steps::CreateVirtualMachine;
