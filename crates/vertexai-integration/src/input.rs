//! Caller-facing input shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vertexai_core::{ChatMessage, PromptStructure, TokenItem, Tokenizer, ValidationError};

/// What to send to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum InvocationInput {
    /// A fully structured prompt.
    Prompt(PromptStructure),
    /// A role-tagged message list.
    Messages(Vec<ChatMessage>),
    /// Plain text, treated as a prompt-only structure.
    Text(String),
}

impl InvocationInput {
    pub fn into_prompt(self) -> Result<PromptStructure, ValidationError> {
        match self {
            Self::Prompt(prompt) => Ok(prompt),
            Self::Messages(messages) => PromptStructure::from_messages(&messages),
            Self::Text(text) => Ok(PromptStructure::from_prompt(text)),
        }
    }
}

impl From<&str> for InvocationInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<PromptStructure> for InvocationInput {
    fn from(prompt: PromptStructure) -> Self {
        Self::Prompt(prompt)
    }
}

/// Data whose token count is requested.
///
/// An object is a prompt structure only when every key is a prompt field;
/// any other string-valued object is a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountInput {
    Text(String),
    Records(Vec<HashMap<String, String>>),
    Prompt(PromptStructure),
    Record(HashMap<String, String>),
}

impl CountInput {
    /// Token count under `tokenizer`'s item policy.
    pub fn count(&self, tokenizer: &dyn Tokenizer) -> usize {
        match self {
            Self::Text(text) => tokenizer.count(TokenItem::Text(text)),
            Self::Records(records) => records
                .iter()
                .map(|record| tokenizer.count(TokenItem::Record(record)))
                .sum(),
            Self::Prompt(prompt) => prompt.token_cost(tokenizer),
            Self::Record(record) => tokenizer.count(TokenItem::Record(record)),
        }
    }
}
