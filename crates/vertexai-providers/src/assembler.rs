//! Request assembly: trimmed conversation + parameters -> provider call shape.

use tracing::debug;
use vertexai_core::{DispatchMode, ModelDescriptor, TrimmedConversation};

use crate::error::{ProviderError, Result};
use crate::registry::CHAT_PREFIX;
use crate::types::{CallParameters, ChatRequest, CompletionRequest, EmbeddingRequest, ProviderRequest};

/// Builds provider requests according to a [`DispatchMode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestAssembler {
    mode: DispatchMode,
}

impl RequestAssembler {
    pub fn new(mode: DispatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Pick the chat or completion shape for `model` and build the request.
    pub fn assemble(
        &self,
        conversation: TrimmedConversation,
        params: &CallParameters,
        model: &ModelDescriptor,
    ) -> Result<ProviderRequest> {
        let chat = match self.mode {
            DispatchMode::Capabilities => {
                if model.capabilities.chat_completion {
                    true
                } else if model.capabilities.completion {
                    false
                } else {
                    return Err(ProviderError::unsupported(
                        &model.id,
                        "chat completion or text completion",
                    ));
                }
            }
            DispatchMode::LegacyPrefix => params.model_name.starts_with(CHAT_PREFIX),
        };

        if chat {
            debug!(model = %params.model_name, stream = params.stream, "using chat request shape");
            self.chat_request(conversation, params).map(ProviderRequest::Chat)
        } else {
            debug!(model = %params.model_name, stream = params.stream, "using completion request shape");
            self.completion_request(conversation, params)
                .map(ProviderRequest::Completion)
        }
    }

    fn chat_request(
        &self,
        conversation: TrimmedConversation,
        params: &CallParameters,
    ) -> Result<ChatRequest> {
        let message = conversation.prompt.ok_or_else(|| {
            ProviderError::validation("no user prompt left to send after fitting the input budget")
        })?;

        Ok(ChatRequest {
            model: params.model_name.clone(),
            context: conversation.context,
            examples: conversation.examples,
            history: conversation.chat_history,
            message,
            parameters: params.sampling(!params.stream),
            stream: params.stream,
        })
    }

    fn completion_request(
        &self,
        conversation: TrimmedConversation,
        params: &CallParameters,
    ) -> Result<CompletionRequest> {
        let prompt = completion_prompt(&conversation);
        if prompt.trim().is_empty() {
            return Err(ProviderError::validation(
                "completion prompt is empty after fitting the input budget",
            ));
        }

        Ok(CompletionRequest {
            model: params.model_name.clone(),
            prompt,
            parameters: params.sampling(true),
            tuned_model_name: params.tuned_model_name.clone(),
            stream: params.stream,
        })
    }

    /// Build an embedding request. The model must support embeddings.
    pub fn assemble_embedding(
        &self,
        model: &ModelDescriptor,
        texts: Vec<String>,
    ) -> Result<EmbeddingRequest> {
        if !model.capabilities.embeddings {
            return Err(ProviderError::unsupported(&model.id, "embeddings"));
        }
        if texts.is_empty() {
            return Err(ProviderError::validation("no texts to embed"));
        }
        Ok(EmbeddingRequest {
            model: model.id.clone(),
            texts,
        })
    }
}

/// Flatten context, examples, and the final prompt into one text blob.
///
/// Each example renders as `"\ninput: {input}\noutput: {output}"`; the final
/// prompt, when present, fills a trailing slot with an empty output.
/// Chat history has no place in this shape.
pub fn completion_prompt(conversation: &TrimmedConversation) -> String {
    let mut text = conversation.context.clone().unwrap_or_default();
    for example in &conversation.examples {
        text.push_str(&render_pair(&example.input, &example.output));
    }
    if let Some(prompt) = &conversation.prompt {
        text.push_str(&render_pair(prompt, ""));
    }
    text
}

fn render_pair(input: &str, output: &str) -> String {
    format!("\ninput: {}\noutput: {}", input, output)
}
