//! DBaaS control plane core.
//!
//! This crate holds everything the workflow engine consumes as a
//! collaborator:
//!
//! - [`models`]: hosts, instances, database infras, plans and bundles
//! - [`storage`]: the [`ResourceStore`] trait and an in-memory implementation
//! - [`credentials`]: environment-scoped credential resolution
//! - [`provider`]: the narrow infrastructure provider contract
//! - [`config`]: YAML-backed tunables
//! - [`defaults`]: explicit defaulting rules applied before persistence
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dbaas_core::{Host, MemoryStore, ResourceStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = MemoryStore::new();
//!     let mut host = Host::new("db-01.example.com", "10.0.0.1");
//!     let id = store.create_host(&mut host).await?;
//!     println!("Created host {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod defaults;
pub mod error;
pub mod models;
pub mod provider;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::DbaasConfig;
pub use credentials::{CredentialGateway, CredentialKind, Credentials, StaticCredentialGateway};
pub use error::{CredentialError, DbaasError, ProviderError, Result};
pub use models::{
    Bundle, DatabaseInfra, Environment, Host, HostAttr, Instance, InstanceStatus, InstanceType,
    Offering, Plan, PlanAttr, ProviderKind,
};
pub use provider::{
    DeployRequest, InfrastructureProvider, Nic, ProviderFactory, SharedProvider, VmDescriptor,
};
pub use storage::{MemoryStore, ResourceStore};
pub use types::{
    BundleId, BundleScope, DatabaseInfraId, DiskOfferingId, EngineId, EnvironmentId, HostAttrId,
    HostId, InstanceId, PlanId,
};
