//! Control plane configuration.
//!
//! Configuration is a YAML document; every key is optional and falls back
//! to its default.
//!
//! ```yaml
//! ha_min_number_of_bundles: 3
//! bundle_rotation_max_retries: 5
//! affinity_group_parameter: affinity_group_id
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DbaasError, Result};

fn default_ha_min_number_of_bundles() -> usize {
    3
}

fn default_bundle_rotation_max_retries() -> u32 {
    5
}

fn default_affinity_group_parameter() -> String {
    "affinity_group_id".to_string()
}

/// Tunables read by workflow steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbaasConfig {
    /// Minimum active bundles an HA CloudStack plan must have
    #[serde(default = "default_ha_min_number_of_bundles")]
    pub ha_min_number_of_bundles: usize,
    /// Attempts at advancing a plan's last-used bundle before giving up
    #[serde(default = "default_bundle_rotation_max_retries")]
    pub bundle_rotation_max_retries: u32,
    /// Credential parameter holding the affinity group for new VMs
    #[serde(default = "default_affinity_group_parameter")]
    pub affinity_group_parameter: String,
}

impl Default for DbaasConfig {
    fn default() -> Self {
        Self {
            ha_min_number_of_bundles: default_ha_min_number_of_bundles(),
            bundle_rotation_max_retries: default_bundle_rotation_max_retries(),
            affinity_group_parameter: default_affinity_group_parameter(),
        }
    }
}

impl DbaasConfig {
    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.bundle_rotation_max_retries == 0 {
            return Err(DbaasError::Config(
                "bundle_rotation_max_retries must be at least 1".to_string(),
            ));
        }
        if self.affinity_group_parameter.is_empty() {
            return Err(DbaasError::Config(
                "affinity_group_parameter must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
