//! Environment-scoped credential resolution.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::CredentialError;
use crate::models::Environment;

/// Kind of credential a step asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialKind {
    /// API access to the CloudStack provider
    CloudStack,
    /// Login on provisioned virtual machines
    Vm,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::CloudStack => write!(f, "CLOUDSTACK"),
            CredentialKind::Vm => write!(f, "VM"),
        }
    }
}

/// Resolved credential set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub endpoint: String,
    /// Provider project the resources belong to
    pub project: String,
    /// Free-form named parameters (e.g. `affinity_group_id`)
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Named parameter value, if set.
    pub fn get_parameter_by_name(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

/// Resolves credentials for an environment.
#[async_trait]
pub trait CredentialGateway: Send + Sync {
    /// Fails with [`CredentialError::NotFound`] when nothing is registered.
    async fn resolve(
        &self,
        environment: &Environment,
        kind: CredentialKind,
    ) -> Result<Credentials, CredentialError>;
}

/// Credential gateway backed by a registration table.
#[derive(Debug, Default)]
pub struct StaticCredentialGateway {
    entries: RwLock<HashMap<(String, CredentialKind), Credentials>>,
}

impl StaticCredentialGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) credentials of `kind` for `environment`.
    pub async fn register(
        &self,
        environment: impl Into<String>,
        kind: CredentialKind,
        credentials: Credentials,
    ) {
        self.entries
            .write()
            .await
            .insert((environment.into(), kind), credentials);
    }
}

#[async_trait]
impl CredentialGateway for StaticCredentialGateway {
    async fn resolve(
        &self,
        environment: &Environment,
        kind: CredentialKind,
    ) -> Result<Credentials, CredentialError> {
        self.entries
            .read()
            .await
            .get(&(environment.name.clone(), kind))
            .cloned()
            .ok_or_else(|| CredentialError::NotFound {
                environment: environment.name.clone(),
                kind,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_registered_credentials() {
        let gateway = StaticCredentialGateway::new();
        let env = Environment::new(1, "prod");
        gateway
            .register(
                "prod",
                CredentialKind::CloudStack,
                Credentials::new("api", "key")
                    .with_project("p-1")
                    .with_parameter("affinity_group_id", "ag-7"),
            )
            .await;

        let creds = gateway.resolve(&env, CredentialKind::CloudStack).await.unwrap();
        assert_eq!(creds.project, "p-1");
        assert_eq!(creds.get_parameter_by_name("affinity_group_id"), Some("ag-7"));
        assert_eq!(creds.get_parameter_by_name("missing"), None);
    }

    #[tokio::test]
    async fn test_resolve_is_scoped_by_environment_and_kind() {
        let gateway = StaticCredentialGateway::new();
        gateway
            .register("dev", CredentialKind::Vm, Credentials::new("root", "pw"))
            .await;

        let prod = Environment::new(2, "prod");
        let err = gateway.resolve(&prod, CredentialKind::Vm).await.unwrap_err();
        assert_eq!(
            err,
            CredentialError::NotFound {
                environment: "prod".to_string(),
                kind: CredentialKind::Vm,
            }
        );

        let dev = Environment::new(1, "dev");
        assert!(gateway.resolve(&dev, CredentialKind::CloudStack).await.is_err());
    }
}
