//! Error types for the DBaaS core.

use crate::credentials::CredentialKind;

/// Main error type for the DBaaS core.
///
/// All store, gateway and configuration operations return
/// `Result<T> = std::result::Result<T, DbaasError>`.
#[derive(thiserror::Error, Debug)]
pub enum DbaasError {
    /// Entity could not be found in the resource store.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (e.g. "host")
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Resource store operation failed.
    #[error("Store error: {0}")]
    StoreError(String),

    /// Credentials could not be resolved.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Infrastructure provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A precondition for the operation does not hold.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// YAML configuration could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DbaasError {
    /// Builds a [`DbaasError::NotFound`] for the given entity kind and id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Credential resolution failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No credential of the requested kind is registered for the environment.
    #[error("Credential {kind} not found for environment {environment}")]
    NotFound {
        environment: String,
        kind: CredentialKind,
    },
}

/// Infrastructure provider failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider rejected or failed the request.
    #[error("Provider request {operation} failed: {message}")]
    RequestFailed {
        operation: &'static str,
        message: String,
    },

    /// The provider does not know the virtual machine.
    #[error("Virtual machine not found: {0}")]
    VmNotFound(String),

    /// The provider answered but the response is unusable.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Type alias for Result with DbaasError.
pub type Result<T> = std::result::Result<T, DbaasError>;
