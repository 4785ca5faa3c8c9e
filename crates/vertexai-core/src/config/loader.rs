//! Configuration loading and persistence.

use super::{Config, ValidatedSettings};
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "loading configuration");
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to the default path.
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = paths::config_file()?;
        self.save(&path)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize as pretty JSON, which is valid JSON5.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the integration settings.
    pub fn validate(&self) -> Result<ValidatedSettings, ConfigError> {
        self.integration.clone().validate()
    }

    /// The vault directory: the configured one, else `~/.vertexai/secrets`.
    pub fn secrets_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.secrets.dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::secrets_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchMode;
    use crate::secret::SecretField;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        // Vertex AI integration
        integration: {
            project: "acme-prod",
            zone: "us-central1",
            model_name: "text-bison@001",
            service_account_info: { from_secrets: true, value: "{{secret.vertex_sa}}" },
            max_decode_steps: 128,
            dispatch: "legacy_prefix",
        },
        secrets: { dir: "/var/lib/vertexai/secrets" },
        logging: { filter: "vertexai=debug" },
    }"#;

    #[test]
    fn test_parse_json5() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.integration.project, "acme-prod");
        assert_eq!(config.integration.location, "us-central1");
        assert_eq!(config.integration.max_output_tokens, 128);
        assert_eq!(config.integration.dispatch, DispatchMode::LegacyPrefix);
        assert_eq!(
            config.integration.service_account_info,
            Some(SecretField::reference("vertex_sa"))
        );
        assert_eq!(
            config.secrets_dir().unwrap(),
            PathBuf::from("/var/lib/vertexai/secrets")
        );
        assert_eq!(config.logging.filter.as_deref(), Some("vertexai=debug"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        let err = Config::parse("{ integration: ").unwrap_err();
        assert!(matches!(err, ConfigError::Json5(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.json5")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("vertexai.json5");

        let config = Config::parse(SAMPLE).unwrap();
        config.save(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.integration, config.integration);
        assert_eq!(reloaded.secrets.dir, config.secrets.dir);
    }

    #[test]
    fn test_empty_config_fails_validation() {
        let config = Config::parse("{}").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("project")));
    }
}
