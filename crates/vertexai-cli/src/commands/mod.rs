//! CLI command implementations.

pub mod config;
pub mod invoke;
pub mod models;
pub mod secrets;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use vertexai_core::{paths, Config, ValidatedSettings};
use vertexai_integration::VertexIntegration;
use vertexai_secrets::FileSecretStore;

/// Load the config from `path`, else from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    Ok(config)
}

/// The config file's integration settings, validated.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<(Config, ValidatedSettings)> {
    let config = load_config(path).context("Failed to load configuration")?;
    let settings = config.validate().context("Invalid integration settings")?;
    Ok((config, settings))
}

/// Open the vault configured by `config`.
pub fn open_store(config: &Config) -> anyhow::Result<FileSecretStore> {
    let dir = config.secrets_dir()?;
    debug!(dir = %dir.display(), "opening secret vault");
    FileSecretStore::open(dir).context("Failed to initialize secret store")
}

/// Open the vault at the default location when no config file exists yet.
pub fn open_store_or_default(path: Option<&Path>) -> anyhow::Result<FileSecretStore> {
    match load_config(path) {
        Ok(config) => open_store(&config),
        Err(_) => {
            let dir = paths::secrets_dir()?;
            FileSecretStore::open(dir).context("Failed to initialize secret store")
        }
    }
}

/// Build the integration service around the configured vault.
pub async fn build_integration(config: &Config) -> anyhow::Result<VertexIntegration> {
    let store = Arc::new(open_store(config)?);
    Ok(VertexIntegration::from_store(store).await?)
}
