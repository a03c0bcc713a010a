//! Infrastructure provider contract.
//!
//! Only the calls the workflow engine needs are modelled. Timeouts and
//! retries belong to the implementation behind this trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::ProviderError;
use crate::models::{Bundle, Environment, Offering};

/// Network interface of a provisioned VM.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nic {
    pub ip_address: String,
    pub network_id: String,
}

/// Virtual machine as reported by the provider after deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmDescriptor {
    pub id: String,
    pub name: String,
    pub nics: Vec<Nic>,
}

impl VmDescriptor {
    /// Address of the first network interface.
    pub fn primary_ip(&self) -> Result<&str, ProviderError> {
        self.nics
            .first()
            .map(|nic| nic.ip_address.as_str())
            .ok_or_else(|| {
                ProviderError::MalformedResponse(format!("vm {} has no network interface", self.id))
            })
    }
}

/// Parameters of a VM deployment.
#[derive(Clone, Debug)]
pub struct DeployRequest<'a> {
    pub offering: &'a Offering,
    pub bundle: &'a Bundle,
    pub project: &'a str,
    pub vm_name: &'a str,
    pub affinity_group_id: Option<&'a str>,
}

/// Blocking-style infrastructure operations, awaited one at a time.
#[async_trait]
pub trait InfrastructureProvider: Send + Sync {
    /// Deploys a VM. `Ok(None)` means the provider accepted the call but
    /// created nothing.
    async fn deploy_vm(
        &self,
        request: DeployRequest<'_>,
    ) -> Result<Option<VmDescriptor>, ProviderError>;

    /// Destroys a VM. `Ok(false)` means the provider refused.
    async fn destroy_vm(
        &self,
        project: &str,
        environment: &Environment,
        vm_id: &str,
    ) -> Result<bool, ProviderError>;

    /// Network the VM is attached to.
    async fn get_vm_network(&self, vm_id: &str, project: &str) -> Result<String, ProviderError>;
}

/// Builds provider clients from resolved credentials.
pub trait ProviderFactory: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn InfrastructureProvider>, ProviderError>;
}

/// Factory that hands out one shared client regardless of credentials.
pub struct SharedProvider(pub Arc<dyn InfrastructureProvider>);

impl ProviderFactory for SharedProvider {
    fn connect(&self, _credentials: &Credentials) -> Result<Arc<dyn InfrastructureProvider>, ProviderError> {
        Ok(Arc::clone(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_ip() {
        let vm = VmDescriptor {
            id: "vm-1".to_string(),
            name: "db-01".to_string(),
            nics: vec![
                Nic {
                    ip_address: "10.1.0.5".to_string(),
                    network_id: "net-a".to_string(),
                },
                Nic {
                    ip_address: "10.2.0.5".to_string(),
                    network_id: "net-b".to_string(),
                },
            ],
        };
        assert_eq!(vm.primary_ip().unwrap(), "10.1.0.5");
    }

    #[test]
    fn test_primary_ip_without_nic() {
        let vm = VmDescriptor {
            id: "vm-2".to_string(),
            name: "db-02".to_string(),
            nics: Vec::new(),
        };
        assert!(matches!(
            vm.primary_ip(),
            Err(ProviderError::MalformedResponse(_))
        ));
    }
}
