//! Configuration schema definitions.

use crate::error::ConfigError;
use crate::secret::SecretField;
use crate::types::ModelDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Deref;
use std::path::PathBuf;

/// Current settings schema version.
pub const SETTINGS_VERSION: u32 = 1;

/// Main vertexai configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Provider integration settings.
    #[serde(default)]
    pub integration: IntegrationSettings,

    /// Secret vault settings.
    #[serde(default)]
    pub secrets: SecretsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Secret vault configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Vault directory (defaults to `~/.vertexai/secrets`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// How the request assembler picks between chat and completion shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Use the model's capability flags.
    #[default]
    Capabilities,
    /// Chat if the model name starts with `chat`, otherwise completion.
    LegacyPrefix,
}

/// Settings for one Vertex AI integration instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationSettings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Cloud project id.
    #[serde(default)]
    pub project: String,

    /// Region, e.g. `us-central1`.
    #[serde(default, alias = "zone")]
    pub location: String,

    /// Credentials JSON, inline or as a vault reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_info: Option<SecretField>,

    #[serde(default)]
    pub model_name: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(
        default = "default_max_output_tokens",
        alias = "max_decode_steps",
        alias = "max_tokens"
    )]
    pub max_output_tokens: u32,

    /// Overrides the registry's input-token limit for `model_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_token_limit: Option<usize>,

    /// Tuned model resource used for completion calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuned_model_name: Option<String>,

    /// Base URL override for the provider REST API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,

    #[serde(default)]
    pub dispatch: DispatchMode,

    /// Previously discovered models.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelDescriptor>,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

fn default_temperature() -> f64 {
    1.0
}

fn default_top_k() -> u32 {
    40
}

fn default_top_p() -> f64 {
    0.8
}

fn default_max_output_tokens() -> u32 {
    256
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            project: String::new(),
            location: String::new(),
            service_account_info: None,
            model_name: String::new(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            input_token_limit: None,
            tuned_model_name: None,
            api_endpoint: None,
            dispatch: DispatchMode::default(),
            models: Vec::new(),
        }
    }
}

impl IntegrationSettings {
    /// Validate once at the boundary, reporting every problem together.
    pub fn validate(self) -> Result<ValidatedSettings, ConfigError> {
        let errors = self.problems();
        if errors.is_empty() {
            Ok(ValidatedSettings(self))
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }

    /// Every problem with these settings, in field order.
    pub fn problems(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.version != SETTINGS_VERSION {
            errors.push(format!(
                "Unsupported settings version {}, expected {}",
                self.version, SETTINGS_VERSION
            ));
        }

        if self.project.trim().is_empty() {
            errors.push("project must not be empty".to_string());
        }
        if self.location.trim().is_empty() {
            errors.push("location must not be empty".to_string());
        }
        if self.model_name.trim().is_empty() {
            errors.push("model_name must not be empty".to_string());
        }

        match &self.service_account_info {
            None => errors.push("service_account_info must be set".to_string()),
            Some(field) if field.is_empty() => {
                errors.push("service_account_info must not be empty".to_string())
            }
            Some(_) => {}
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            errors.push(format!("temperature must be 0-2, got {}", self.temperature));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            errors.push(format!("top_p must be in (0, 1], got {}", self.top_p));
        }
        if self.top_k == 0 {
            errors.push("top_k must be greater than 0".to_string());
        }
        if self.max_output_tokens == 0 {
            errors.push("max_output_tokens must be greater than 0".to_string());
        }
        if self.input_token_limit == Some(0) {
            errors.push("input_token_limit must be greater than 0".to_string());
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.trim().is_empty() {
                errors.push("models: model id must not be empty".to_string());
            } else if !seen.insert(model.id.as_str()) {
                errors.push(format!("models: duplicate model id '{}'", model.id));
            }
        }

        errors
    }

    /// Apply per-request overrides. The result must be validated again.
    pub fn with_overrides(mut self, overrides: &SettingsOverrides) -> Self {
        if let Some(model_name) = &overrides.model_name {
            self.model_name = model_name.clone();
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = temperature;
        }
        if let Some(top_k) = overrides.top_k {
            self.top_k = top_k;
        }
        if let Some(top_p) = overrides.top_p {
            self.top_p = top_p;
        }
        if let Some(max_output_tokens) = overrides.max_output_tokens {
            self.max_output_tokens = max_output_tokens;
        }
        self
    }

    /// Find a previously discovered model by id.
    pub fn model(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }
}

/// Per-request parameter overrides sent alongside an invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(
        default,
        alias = "max_decode_steps",
        alias = "max_tokens",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_output_tokens: Option<u32>,
}

impl SettingsOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Settings that passed [`IntegrationSettings::validate`].
///
/// The request pipeline only accepts this type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings(IntegrationSettings);

impl ValidatedSettings {
    pub fn into_inner(self) -> IntegrationSettings {
        self.0
    }
}

impl Deref for ValidatedSettings {
    type Target = IntegrationSettings;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
