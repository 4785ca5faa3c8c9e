//! Error types for the secret vault.

use thiserror::Error;

/// Errors that can occur during secret operations.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret not found: {scope}/{name}")]
    NotFound { scope: String, name: String },

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Master key error: {0}")]
    MasterKey(String),

    #[error("Invalid secret name: {0}")]
    InvalidName(String),

    #[error("Invalid scope key: {0}")]
    InvalidScope(String),

    #[error("Invalid secret reference: {0}")]
    InvalidReference(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SecretError {
    pub(crate) fn not_found(scope: &str, name: &str) -> Self {
        Self::NotFound {
            scope: scope.to_string(),
            name: name.to_string(),
        }
    }
}

/// Convenience result alias for secret operations.
pub type Result<T> = std::result::Result<T, SecretError>;
