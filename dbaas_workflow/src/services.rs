//! Collaborators injected into steps.

use std::sync::Arc;

use dbaas_core::{CredentialGateway, DbaasConfig, ProviderFactory, ResourceStore};

/// Shared handles a step needs to reach the outside world.
///
/// Cheap to clone; every field is reference counted.
#[derive(Clone)]
pub struct WorkflowServices {
    pub store: Arc<dyn ResourceStore>,
    pub credentials: Arc<dyn CredentialGateway>,
    pub providers: Arc<dyn ProviderFactory>,
    pub config: Arc<DbaasConfig>,
}

impl WorkflowServices {
    /// Creates services with the default configuration.
    pub fn new(
        store: Arc<dyn ResourceStore>,
        credentials: Arc<dyn CredentialGateway>,
        providers: Arc<dyn ProviderFactory>,
    ) -> Self {
        Self {
            store,
            credentials,
            providers,
            config: Arc::new(DbaasConfig::default()),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: DbaasConfig) -> Self {
        self.config = Arc::new(config);
        self
    }
}
