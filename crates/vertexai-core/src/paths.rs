//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Environment variable that relocates the base directory.
pub const HOME_ENV: &str = "VERTEXAI_HOME";

/// Get the vertexai base directory (`$VERTEXAI_HOME`, else `~/.vertexai`).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".vertexai"))
}

/// Get the main config file path (`<base>/vertexai.json5`).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("vertexai.json5"))
}

/// Get the secret vault directory (`<base>/secrets`).
pub fn secrets_dir() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("secrets"))
}

/// Ensure the base and vault directories exist.
pub fn ensure_dirs() -> Result<(), ConfigError> {
    for dir in [base_dir()?, secrets_dir()?] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
    }
    Ok(())
}
