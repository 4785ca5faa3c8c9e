//! Error types for the provider pipeline.

use thiserror::Error;
use vertexai_secrets::SecretError;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Provider error types.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The credential blob could not be revealed, parsed, or used.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The provider (or its token endpoint) is unreachable or rejected initialization.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The model supports none of the shapes the operation needs.
    #[error("Model '{model}' does not support {operation}")]
    UnsupportedModelCapability { model: String, operation: String },

    /// Malformed request shape.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),
}

impl ProviderError {
    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn unsupported(model: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedModelCapability {
            model: model.into(),
            operation: operation.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Map a non-success HTTP status from the prediction API.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => Self::InvalidRequest(message),
            401 | 403 => Self::Authentication(message),
            404 => Self::ModelNotFound(message),
            429 => Self::RateLimit(message),
            _ => Self::server_error(status, message),
        }
    }

    /// Whether a caller-side retry could succeed. Nothing in this crate retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimit(_) | Self::Connection(_) | Self::Network(_) => true,
            Self::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<SecretError> for ProviderError {
    fn from(err: SecretError) -> Self {
        Self::Credential(err.to_string())
    }
}
