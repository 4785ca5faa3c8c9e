//! Integration error type.

use thiserror::Error;
use vertexai_core::{ConfigError, ValidationError};
use vertexai_providers::ProviderError;
use vertexai_secrets::SecretError;

/// Result type for integration operations.
pub type Result<T> = std::result::Result<T, IntegrationError>;

/// Every failure an integration operation can report.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntegrationError {
    /// Short machine-readable category, used in dispatch failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Validation(_) => "validation",
            Self::Provider(ProviderError::Credential(_) | ProviderError::Authentication(_))
            | Self::Secret(_) => "credential",
            Self::Provider(ProviderError::Connection(_)) => "connection",
            Self::Provider(ProviderError::UnsupportedModelCapability { .. }) => "unsupported_model_capability",
            Self::Provider(ProviderError::Validation(_)) => "validation",
            Self::Provider(_) => "provider",
            Self::Json(_) => "serialization",
        }
    }
}
