//! Turning [`SecretField`] settings into plaintext credentials.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use vertexai_core::{SecretField, SecretString};

use crate::error::{Result, SecretError};
use crate::store::{validate_scope, SecretStore, DEFAULT_SCOPE};

static REFERENCE: Lazy<std::result::Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^\{\{\s*secret\.([A-Za-z0-9_-]+)\s*\}\}$"));

/// Extract `NAME` from a `{{secret.NAME}}` reference.
pub fn parse_reference(value: &str) -> Result<String> {
    let pattern = REFERENCE
        .as_ref()
        .map_err(|e| SecretError::InvalidReference(e.to_string()))?;
    pattern
        .captures(value.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            SecretError::InvalidReference(format!("expected {{{{secret.NAME}}}}, got '{value}'"))
        })
}

/// Materializes credential plaintext from settings fields.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Reveal `field`. References are looked up in the `scope` partition
    /// (`administration` when `None`).
    async fn reveal(&self, field: &SecretField, scope: Option<&str>) -> Result<SecretString>;
}

/// Resolver backed by a [`SecretStore`].
pub struct VaultResolver {
    store: Arc<dyn SecretStore>,
}

impl VaultResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }
}

#[async_trait]
impl SecretResolver for VaultResolver {
    async fn reveal(&self, field: &SecretField, scope: Option<&str>) -> Result<SecretString> {
        match field {
            SecretField::Plain(value) => Ok(value.clone()),
            SecretField::Reference {
                from_secrets: false,
                value,
            } => Ok(SecretString::new(value.as_str())),
            SecretField::Reference { value, .. } => {
                let scope = scope.unwrap_or(DEFAULT_SCOPE);
                validate_scope(scope)?;
                let name = parse_reference(value)?;
                debug!(scope, name = %name, "revealing secret reference");
                self.store.get(scope, &name).await
            }
        }
    }
}
