//! Structured request/response boundary for hosts.
//!
//! Hosts send a [`DispatchRequest`] and always get a [`DispatchResult`] back;
//! errors never escape as panics or transport failures.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use vertexai_core::{IntegrationSettings, SettingsOverrides, ValidatedSettings};

use crate::error::{IntegrationError, Result};
use crate::input::{CountInput, InvocationInput};
use crate::integration::VertexIntegration;

/// One host call.
///
/// Streaming has no place here: a stream is consumed through
/// [`VertexIntegration::stream`] directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum DispatchRequest {
    CheckSettings {
        settings: IntegrationSettings,
        #[serde(default)]
        scope: Option<String>,
    },
    GetModels {
        settings: IntegrationSettings,
        #[serde(default)]
        scope: Option<String>,
    },
    CountTokens {
        data: CountInput,
    },
    Invoke {
        settings: IntegrationSettings,
        #[serde(default)]
        scope: Option<String>,
        input: InvocationInput,
        #[serde(default)]
        overrides: SettingsOverrides,
    },
    Embed {
        settings: IntegrationSettings,
        #[serde(default)]
        scope: Option<String>,
        texts: Vec<String>,
    },
    EmbedQuery {
        settings: IntegrationSettings,
        #[serde(default)]
        scope: Option<String>,
        text: String,
    },
    IndexerConfig {
        settings: IntegrationSettings,
        model: String,
    },
    Metadata,
}

impl DispatchRequest {
    pub fn method(&self) -> &'static str {
        match self {
            Self::CheckSettings { .. } => "check_settings",
            Self::GetModels { .. } => "get_models",
            Self::CountTokens { .. } => "count_tokens",
            Self::Invoke { .. } => "invoke",
            Self::Embed { .. } => "embed",
            Self::EmbedQuery { .. } => "embed_query",
            Self::IndexerConfig { .. } => "indexer_config",
            Self::Metadata => "metadata",
        }
    }
}

/// Outcome of a dispatched call, `{"ok": true, "response": ..}` or
/// `{"ok": false, "error": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DispatchResult {
    Success { ok: bool, response: Value },
    Failure { ok: bool, error: DispatchError },
}

/// Error details carried by a failed dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchError {
    pub kind: String,
    pub message: String,
}

impl DispatchResult {
    pub fn success(response: Value) -> Self {
        Self::Success { ok: true, response }
    }

    pub fn failure(err: &IntegrationError) -> Self {
        Self::Failure {
            ok: false,
            error: DispatchError {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

fn validated(settings: IntegrationSettings) -> Result<ValidatedSettings> {
    Ok(settings.validate()?)
}

impl VertexIntegration {
    /// Run `request` and fold its outcome into a [`DispatchResult`].
    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchResult {
        let method = request.method();
        match self.dispatch_inner(request).await {
            Ok(response) => DispatchResult::success(response),
            Err(err) => {
                error!(method, kind = err.kind(), error = %err, "dispatch failed");
                DispatchResult::failure(&err)
            }
        }
    }

    async fn dispatch_inner(&self, request: DispatchRequest) -> Result<Value> {
        let value = match request {
            DispatchRequest::CheckSettings { settings, scope } => {
                self.check_settings(settings, scope.as_deref()).await?;
                Value::Bool(true)
            }
            DispatchRequest::GetModels { settings, scope } => {
                let settings = validated(settings)?;
                serde_json::to_value(self.get_models(&settings, scope.as_deref()).await?)?
            }
            DispatchRequest::CountTokens { data } => Value::from(self.count_tokens(&data)),
            DispatchRequest::Invoke {
                settings,
                scope,
                input,
                overrides,
            } => {
                let settings = validated(settings.with_overrides(&overrides))?;
                serde_json::to_value(self.invoke(&settings, scope.as_deref(), input).await?)?
            }
            DispatchRequest::Embed {
                settings,
                scope,
                texts,
            } => {
                let settings = validated(settings)?;
                serde_json::to_value(self.embed(&settings, scope.as_deref(), texts).await?)?
            }
            DispatchRequest::EmbedQuery {
                settings,
                scope,
                text,
            } => {
                let settings = validated(settings)?;
                serde_json::to_value(self.embed_query(&settings, scope.as_deref(), text).await?)?
            }
            DispatchRequest::IndexerConfig { settings, model } => {
                let settings = validated(settings)?;
                serde_json::to_value(self.indexer_config(&settings, &model)?)?
            }
            DispatchRequest::Metadata => serde_json::to_value(self.metadata())?,
        };
        Ok(value)
    }
}
