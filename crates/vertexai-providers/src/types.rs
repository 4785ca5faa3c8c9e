//! Request, raw-response, and envelope types shared by the provider pipeline.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use vertexai_core::{ChatTurn, Example, ValidatedSettings};

use crate::error::Result;

/// Sampling parameters sent with every generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingParameters {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    /// Omitted for streaming chat calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Per-request call parameters, derived once from validated settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CallParameters {
    pub model_name: String,
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
    pub stream: bool,
    pub tuned_model_name: Option<String>,
}

impl CallParameters {
    pub fn from_settings(settings: &ValidatedSettings, stream: bool) -> Self {
        Self {
            model_name: settings.model_name.clone(),
            temperature: settings.temperature,
            top_k: settings.top_k,
            top_p: settings.top_p,
            max_output_tokens: settings.max_output_tokens,
            stream,
            tuned_model_name: settings.tuned_model_name.clone(),
        }
    }

    /// Sampling parameters, with the output cap only when it applies.
    pub fn sampling(&self, include_max_output: bool) -> SamplingParameters {
        SamplingParameters {
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            max_output_tokens: include_max_output.then_some(self.max_output_tokens),
        }
    }
}

/// A multi-turn chat call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub context: Option<String>,
    pub examples: Vec<Example>,
    pub history: Vec<ChatTurn>,
    /// The new user utterance.
    pub message: String,
    pub parameters: SamplingParameters,
    pub stream: bool,
}

/// A flat text-completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub parameters: SamplingParameters,
    pub tuned_model_name: Option<String>,
    pub stream: bool,
}

/// An embedding call.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRequest {
    pub model: String,
    pub texts: Vec<String>,
}

/// A generation request in one of the provider's call shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRequest {
    Chat(ChatRequest),
    Completion(CompletionRequest),
}

impl ProviderRequest {
    pub fn model(&self) -> &str {
        match self {
            Self::Chat(req) => &req.model,
            Self::Completion(req) => &req.model,
        }
    }

    pub fn is_chat(&self) -> bool {
        matches!(self, Self::Chat(_))
    }

    pub fn is_stream(&self) -> bool {
        match self {
            Self::Chat(req) => req.stream,
            Self::Completion(req) => req.stream,
        }
    }
}

/// Token counts reported by the provider, when it reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A raw single-shot prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub text: String,
    pub token_metadata: Option<TokenMetadata>,
}

/// One raw streaming chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChunk {
    pub text: String,
}

/// Forward-only stream of raw chunks.
pub type ChunkStream = BoxStream<'static, Result<RawChunk>>;

/// Forward-only stream of normalized envelopes.
pub type EnvelopeStream = BoxStream<'static, Result<ResponseEnvelope>>;

/// A model entry as returned by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawModel {
    /// Full resource name, e.g. `projects/p/locations/l/models/123`.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

impl RawModel {
    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Envelope kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeObject {
    #[serde(rename = "chat.completion")]
    ChatCompletion,
    #[serde(rename = "chat.completion.chunk")]
    ChatCompletionChunk,
    #[serde(rename = "text_completion")]
    TextCompletion,
    #[serde(rename = "text_completion.chunk")]
    TextCompletionChunk,
}

impl EnvelopeObject {
    pub fn new(chat: bool, stream: bool) -> Self {
        match (chat, stream) {
            (true, false) => Self::ChatCompletion,
            (true, true) => Self::ChatCompletionChunk,
            (false, false) => Self::TextCompletion,
            (false, true) => Self::TextCompletionChunk,
        }
    }
}

/// Generated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// A complete assistant message (chat).
    Message { role: String, content: String },
    /// A partial assistant message (chat stream).
    Delta { content: String },
    /// Completion text, whole or partial.
    Text { text: String },
}

impl Payload {
    pub fn content(&self) -> &str {
        match self {
            Self::Message { content, .. } | Self::Delta { content } => content,
            Self::Text { text } => text,
        }
    }
}

/// Token accounting for a finished response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Canonical response shape, identical for every call path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: String,
    pub object: EnvelopeObject,
    pub model: String,
    /// Unix timestamp, seconds.
    pub created: i64,
    pub finish_reason: Option<String>,
    pub payload: Payload,
    pub usage: Option<Usage>,
}

impl ResponseEnvelope {
    pub fn content(&self) -> &str {
        self.payload.content()
    }
}
