//! Vertex AI REST client.
//!
//! [`ProviderClient`] is the seam between the pipeline and the network. The
//! production implementation talks to the `aiplatform` publisher-model
//! endpoints; tests substitute their own.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use vertexai_core::{ChatRole, SecretString};

use crate::credentials::{Credentials, TokenSource};
use crate::error::{ProviderError, Result};
use crate::types::{
    ChatRequest, ChunkStream, CompletionRequest, EmbeddingRequest, ProviderRequest, RawChunk,
    RawModel, RawPrediction, SamplingParameters, TokenMetadata,
};

const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Where a client points: project, region, and an optional base URL override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientTarget {
    pub project: String,
    pub location: String,
    pub api_endpoint: Option<String>,
}

impl ClientTarget {
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            api_endpoint: None,
        }
    }

    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> Result<String> {
        let raw = match &self.api_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        };
        let parsed = Url::parse(&raw)
            .map_err(|e| ProviderError::connection(format!("invalid API endpoint '{}': {}", raw, e)))?;
        Ok(parsed.as_str().trim_end_matches('/').to_string())
    }
}

/// Network operations against the model provider.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// One-shot prediction.
    async fn predict(&self, request: &ProviderRequest) -> Result<RawPrediction>;

    /// Server-streamed prediction. Chunks arrive in provider order.
    async fn predict_stream(&self, request: &ProviderRequest) -> Result<ChunkStream>;

    /// One vector per input text, in input order.
    async fn embed(&self, request: &EmbeddingRequest) -> Result<Vec<Vec<f32>>>;

    /// Models visible to the project.
    async fn list_models(&self) -> Result<Vec<RawModel>>;
}

/// Builds authenticated clients.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Parse `credentials`, authenticate, and return a ready client.
    ///
    /// Malformed credentials fail with [`ProviderError::Credential`]; an
    /// unreachable or rejecting token endpoint fails with
    /// [`ProviderError::Connection`].
    async fn init_client(
        &self,
        target: &ClientTarget,
        credentials: SecretString,
    ) -> Result<Arc<dyn ProviderClient>>;
}

/// Factory for [`VertexClient`]s sharing one HTTP connection pool.
#[derive(Debug, Clone)]
pub struct VertexClientFactory {
    http: Client,
}

impl VertexClientFactory {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::connection(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ClientFactory for VertexClientFactory {
    async fn init_client(
        &self,
        target: &ClientTarget,
        credentials: SecretString,
    ) -> Result<Arc<dyn ProviderClient>> {
        let credentials = Credentials::parse(&credentials)?;
        let base_url = target.base_url()?;
        let tokens = TokenSource::new(self.http.clone(), credentials);

        // Authenticate up front so bad credentials surface at init.
        tokens.bearer().await?;
        info!(project = %target.project, location = %target.location, "vertex client initialized");

        Ok(Arc::new(VertexClient {
            http: self.http.clone(),
            target: target.clone(),
            base_url,
            tokens,
        }))
    }
}

/// Client for the Vertex AI prediction and model APIs.
pub struct VertexClient {
    http: Client,
    target: ClientTarget,
    base_url: String,
    tokens: TokenSource,
}

impl VertexClient {
    fn location_path(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}",
            self.base_url, self.target.project, self.target.location
        )
    }

    fn model_url(&self, model: &str, verb: &str) -> String {
        if model.starts_with("projects/") {
            format!("{}/v1/{}:{}", self.base_url, model, verb)
        } else {
            format!("{}/publishers/google/models/{}:{}", self.location_path(), model, verb)
        }
    }

    fn predict_url(&self, request: &ProviderRequest, verb: &str) -> String {
        match request {
            ProviderRequest::Completion(CompletionRequest {
                tuned_model_name: Some(tuned),
                ..
            }) => self.model_url(tuned, verb),
            other => self.model_url(other.model(), verb),
        }
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.tokens.bearer().await?;
        Ok(builder.bearer_auth(token.expose_secret()))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self.authorized(builder).await?.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        warn!(status = status.as_u16(), "vertex request failed");
        Err(ProviderError::from_status(status.as_u16(), message))
    }
}

#[async_trait]
impl ProviderClient for VertexClient {
    async fn predict(&self, request: &ProviderRequest) -> Result<RawPrediction> {
        let url = self.predict_url(request, "predict");
        debug!(model = request.model(), chat = request.is_chat(), "sending predict request");

        let response = self
            .send(self.http.post(&url).json(&PredictBody::from_request(request)))
            .await?;
        let body: PredictResponse = response.json().await?;
        body.into_prediction(request.is_chat())
    }

    async fn predict_stream(&self, request: &ProviderRequest) -> Result<ChunkStream> {
        let url = format!("{}?alt=sse", self.predict_url(request, "serverStreamingPredict"));
        debug!(model = request.model(), chat = request.is_chat(), "opening prediction stream");

        let response = self
            .send(self.http.post(&url).json(&PredictBody::from_request(request)))
            .await?;

        let chat = request.is_chat();
        let stream = response
            .bytes_stream()
            .eventsource()
            .filter_map(move |event| async move {
                match event {
                    Ok(event) => {
                        if event.data.is_empty() {
                            return None;
                        }
                        match serde_json::from_str::<PredictResponse>(&event.data) {
                            Ok(chunk) => match chunk.first_text(chat) {
                                Ok(Some(text)) if !text.is_empty() => Some(Ok(RawChunk { text })),
                                Ok(_) => None,
                                Err(e) => Some(Err(e)),
                            },
                            Err(e) => {
                                warn!("Failed to parse SSE event: {}", e);
                                None
                            }
                        }
                    }
                    Err(e) => Some(Err(ProviderError::stream(e.to_string()))),
                }
            });

        Ok(Box::pin(stream))
    }

    async fn embed(&self, request: &EmbeddingRequest) -> Result<Vec<Vec<f32>>> {
        let url = self.model_url(&request.model, "predict");
        let body = EmbedBody {
            instances: request
                .texts
                .iter()
                .map(|text| EmbedInstance { content: text })
                .collect(),
        };
        debug!(model = %request.model, texts = request.texts.len(), "sending embedding request");

        let response = self.send(self.http.post(&url).json(&body)).await?;
        let parsed: EmbedResponse = response.json().await?;
        if parsed.predictions.len() != request.texts.len() {
            return Err(ProviderError::server_error(
                200,
                format!(
                    "expected {} embeddings, got {}",
                    request.texts.len(),
                    parsed.predictions.len()
                ),
            ));
        }
        Ok(parsed
            .predictions
            .into_iter()
            .map(|p| p.embeddings.values)
            .collect())
    }

    async fn list_models(&self) -> Result<Vec<RawModel>> {
        let url = format!("{}/models", self.location_path());
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut builder = self.http.get(&url);
            if let Some(token) = &page_token {
                builder = builder.query(&[("pageToken", token.as_str())]);
            }
            let page: ModelsPage = self.send(builder).await?.json().await?;
            models.extend(page.models);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = models.len(), "listed models");
        Ok(models)
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct PredictBody {
    instances: Vec<Value>,
    parameters: SamplingParameters,
}

impl PredictBody {
    fn from_request(request: &ProviderRequest) -> Self {
        match request {
            ProviderRequest::Chat(chat) => Self {
                instances: vec![chat_instance(chat)],
                parameters: chat.parameters.clone(),
            },
            ProviderRequest::Completion(completion) => Self {
                instances: vec![serde_json::json!({ "prompt": completion.prompt })],
                parameters: completion.parameters.clone(),
            },
        }
    }
}

/// Wire label for a history turn; the provider calls the model side `bot`.
fn author(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "bot",
    }
}

fn chat_instance(chat: &ChatRequest) -> Value {
    let examples: Vec<Value> = chat
        .examples
        .iter()
        .map(|e| {
            serde_json::json!({
                "input": { "content": e.input },
                "output": { "content": e.output },
            })
        })
        .collect();

    let mut messages: Vec<Value> = chat
        .history
        .iter()
        .map(|turn| serde_json::json!({ "author": author(turn.role), "content": turn.content }))
        .collect();
    messages.push(serde_json::json!({ "author": "user", "content": chat.message }));

    let mut instance = serde_json::json!({ "messages": messages });
    if let Some(context) = &chat.context {
        instance["context"] = Value::String(context.clone());
    }
    if !examples.is_empty() {
        instance["examples"] = Value::Array(examples);
    }
    instance
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
    #[serde(default)]
    metadata: Option<PredictMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    safety_attributes: Value,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictMetadata {
    #[serde(default)]
    token_metadata: Option<TokenMetadataBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenMetadataBody {
    input_token_count: Option<TokenCountBody>,
    output_token_count: Option<TokenCountBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenCountBody {
    #[serde(default)]
    total_tokens: usize,
}

/// `safetyAttributes` is an object for text models and an array for chat.
fn is_blocked(safety: &Value) -> bool {
    match safety {
        Value::Object(map) => map.get("blocked").and_then(Value::as_bool).unwrap_or(false),
        Value::Array(items) => items.iter().any(is_blocked),
        _ => false,
    }
}

impl PredictResponse {
    fn first_text(&self, chat: bool) -> Result<Option<String>> {
        let Some(prediction) = self.predictions.first() else {
            return Ok(None);
        };
        if is_blocked(&prediction.safety_attributes) {
            return Err(ProviderError::ContentFiltered(
                "response blocked by provider safety filters".to_string(),
            ));
        }
        let text = if chat {
            prediction.candidates.first().map(|c| c.content.clone())
        } else {
            prediction.content.clone()
        };
        Ok(text)
    }

    fn into_prediction(self, chat: bool) -> Result<RawPrediction> {
        let text = self
            .first_text(chat)?
            .ok_or_else(|| ProviderError::server_error(200, "response contained no predictions"))?;

        let token_metadata = self
            .metadata
            .and_then(|m| m.token_metadata)
            .and_then(|t| match (t.input_token_count, t.output_token_count) {
                (Some(input), Some(output)) => Some(TokenMetadata {
                    input_tokens: input.total_tokens,
                    output_tokens: output.total_tokens,
                }),
                _ => None,
            });

        Ok(RawPrediction {
            text,
            token_metadata,
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbedBody<'a> {
    instances: Vec<EmbedInstance<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedInstance<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    predictions: Vec<EmbedPrediction>,
}

#[derive(Debug, Deserialize)]
struct EmbedPrediction {
    embeddings: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelsPage {
    #[serde(default)]
    models: Vec<RawModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}
