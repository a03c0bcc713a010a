//! Entities of the DBaaS control plane.
//!
//! These are plain data records. Persistence goes through
//! [`ResourceStore`](crate::storage::ResourceStore); nothing here talks to
//! a database or a provider.

use serde::{Deserialize, Serialize};

use crate::error::{DbaasError, Result};
use crate::types::{
    BundleId, DatabaseInfraId, DiskOfferingId, EngineId, EnvironmentId, HostAttrId, HostId,
    InstanceId, PlanId,
};

/// Deployment environment (e.g. "prod", "dev").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub name: String,
}

impl Environment {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: EnvironmentId(id),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Compute service offering requested from the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    /// Provider-side offering identifier
    pub service_offering_id: String,
    pub name: String,
}

/// How hosts of a plan come into existence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Hosts are registered by hand
    #[default]
    PreProvisioned,
    /// Hosts are deployed on demand through CloudStack
    CloudStack,
}

/// Service plan a database infra is built from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub engine_id: EngineId,
    pub is_active: bool,
    pub is_default: bool,
    pub is_ha: bool,
    pub provider: ProviderKind,
    /// Maximum size of each database in MB (0 means unlimited)
    pub max_db_size: u32,
    pub disk_offering_id: Option<DiskOfferingId>,
}

impl Plan {
    /// Creates an active, non-default, non-HA pre-provisioned plan.
    pub fn new(name: impl Into<String>, engine_id: EngineId) -> Self {
        Self {
            id: PlanId::UNSAVED,
            name: name.into(),
            engine_id,
            is_active: true,
            is_default: false,
            is_ha: false,
            provider: ProviderKind::PreProvisioned,
            max_db_size: 0,
            disk_offering_id: None,
        }
    }

    pub fn is_cloudstack(&self) -> bool {
        self.provider == ProviderKind::CloudStack
    }

    pub fn is_pre_provisioned(&self) -> bool {
        self.provider == ProviderKind::PreProvisioned
    }

    /// Checks that an HA CloudStack plan has enough active bundles.
    ///
    /// Plans that are not HA, or not deployed through CloudStack, always pass.
    ///
    /// # Arguments
    ///
    /// * `active_bundles` - Number of active bundles assigned to this plan
    /// * `min_bundles` - Configured minimum (`ha_min_number_of_bundles`)
    pub fn validate_min_environment_bundles(
        &self,
        active_bundles: usize,
        min_bundles: usize,
    ) -> Result<()> {
        if self.is_ha && self.is_cloudstack() && active_bundles < min_bundles {
            return Err(DbaasError::Precondition(format!(
                "Plan {} should have at least {} active bundles, currently has {}",
                self.name, min_bundles, active_bundles
            )));
        }
        Ok(())
    }
}

/// Bundles a plan may deploy into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAttr {
    pub plan_id: PlanId,
    /// Bundle ids in allocation order
    pub bundle_ids: Vec<BundleId>,
}

/// Placement unit (e.g. an availability zone) a VM is deployed into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: BundleId,
    pub name: String,
    pub zone_id: String,
    pub template_id: String,
    /// Provider network the bundle places VMs on
    pub network_id: String,
    pub is_active: bool,
}

impl Bundle {
    pub fn new(name: impl Into<String>, network_id: impl Into<String>) -> Self {
        Self {
            id: BundleId::UNSAVED,
            name: name.into(),
            zone_id: String::new(),
            template_id: String::new(),
            network_id: network_id.into(),
            is_active: true,
        }
    }
}

impl std::fmt::Display for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Machine hosting one or more instances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub hostname: String,
    pub address: String,
    pub monitor_url: Option<String>,
    /// Replacement host while a migration is in flight (relation only)
    pub future_host: Option<HostId>,
    pub os_description: Option<String>,
}

impl Host {
    pub fn new(hostname: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: HostId::UNSAVED,
            hostname: hostname.into(),
            address: address.into(),
            monitor_url: None,
            future_host: None,
            os_description: None,
        }
    }

    /// First dot-delimited segment of the hostname.
    pub fn short_name(&self) -> &str {
        self.hostname.split('.').next().unwrap_or_default()
    }
}

/// Provider metadata attached to a deployed host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAttr {
    pub id: HostAttrId,
    pub host_id: HostId,
    pub vm_id: String,
    pub vm_user: String,
    pub vm_password: String,
    pub bundle_id: BundleId,
}

/// Health of an instance as last observed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    Dead,
    Alive,
    #[default]
    Initializing,
}

/// Role of the process an instance runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceType {
    #[default]
    None,
    MySql,
    MongoDb,
    MongoDbArbiter,
    Redis,
    RedisSentinel,
}

/// Database process listening on a host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub dns: String,
    pub address: String,
    pub port: u16,
    pub databaseinfra_id: DatabaseInfraId,
    pub is_active: bool,
    pub host_id: HostId,
    pub status: InstanceStatus,
    pub instance_type: InstanceType,
    /// Replacement instance while a migration is in flight (relation only)
    pub future_instance: Option<InstanceId>,
    pub read_only: bool,
}

impl Instance {
    pub fn new(host: &Host, port: u16, databaseinfra_id: DatabaseInfraId) -> Self {
        Self {
            id: InstanceId::UNSAVED,
            dns: host.address.clone(),
            address: host.address.clone(),
            port,
            databaseinfra_id,
            is_active: true,
            host_id: host.id,
            status: InstanceStatus::default(),
            instance_type: InstanceType::default(),
            future_instance: None,
            read_only: false,
        }
    }

    pub fn is_database(&self) -> bool {
        matches!(
            self.instance_type,
            InstanceType::MySql | InstanceType::MongoDb | InstanceType::Redis
        )
    }

    pub fn is_redis(&self) -> bool {
        self.instance_type == InstanceType::Redis
    }

    pub fn is_sentinel(&self) -> bool {
        self.instance_type == InstanceType::RedisSentinel
    }

    /// `address:port` pair used to reach the instance.
    pub fn connection(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// A deployed database topology: its plan, environment and VM counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfra {
    pub id: DatabaseInfraId,
    pub name: String,
    pub user: String,
    pub password: String,
    pub engine_id: EngineId,
    pub plan_id: Option<PlanId>,
    pub environment_id: EnvironmentId,
    /// How many databases the infra supports
    pub capacity: u32,
    pub disk_offering_id: Option<DiskOfferingId>,
    pub name_prefix: Option<String>,
    pub name_stamp: Option<String>,
    /// Number of VMs created for this infra so far
    pub last_vm_created: u32,
}

impl DatabaseInfra {
    pub fn new(
        name: impl Into<String>,
        engine_id: EngineId,
        plan_id: Option<PlanId>,
        environment_id: EnvironmentId,
    ) -> Self {
        Self {
            id: DatabaseInfraId::UNSAVED,
            name: name.into(),
            user: String::new(),
            password: String::new(),
            engine_id,
            plan_id,
            environment_id,
            capacity: 1,
            disk_offering_id: None,
            name_prefix: None,
            name_stamp: None,
            last_vm_created: 0,
        }
    }

    /// Remaining database slots; negative when over capacity.
    pub fn available(&self, used: u32) -> i64 {
        i64::from(self.capacity) - i64::from(used)
    }

    /// Derives `name_prefix` and `name_stamp` from a generated hostname.
    ///
    /// Hostnames follow `<prefix>-<n>-<stamp>.<domain>`.
    pub fn update_name_prefix_and_stamp(&mut self, hostname: &str) -> Result<()> {
        let parts: Vec<&str> = hostname.split('-').collect();
        let stamp = parts
            .get(2)
            .and_then(|part| part.split('.').next())
            .filter(|stamp| !stamp.is_empty())
            .ok_or_else(|| {
                DbaasError::Precondition(format!(
                    "hostname {} does not follow <prefix>-<n>-<stamp>",
                    hostname
                ))
            })?;
        self.name_prefix = Some(parts[0].to_string());
        self.name_stamp = Some(stamp.to_string());
        Ok(())
    }
}
