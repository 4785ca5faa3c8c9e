//! Conversational prompt types.
//!
//! [`PromptStructure`] is the untrimmed caller input; [`TrimmedConversation`]
//! is what survives the token budget and is handed to request assembly.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Message name marking the input half of a few-shot example.
pub const EXAMPLE_USER: &str = "example_user";

/// Message name marking the output half of a few-shot example.
pub const EXAMPLE_ASSISTANT: &str = "example_assistant";

/// Speaker of a chat-history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A few-shot input/output pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    pub output: String,
}

impl Example {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The full, untrimmed conversational input for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptStructure {
    /// System context / instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// The newest user utterance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Few-shot examples, in the order they should be shown.
    #[serde(default)]
    pub examples: Vec<Example>,

    /// Prior turns, oldest first.
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

impl PromptStructure {
    /// A structure holding only a final prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    /// Set the system context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Convert a role-tagged message list into a prompt structure.
    ///
    /// Unnamed `system` messages become the context (joined by newlines). A
    /// message named `example_user` pairs with the next `example_assistant`
    /// message to form a few-shot example; both are then excluded from the
    /// history. The final `user` message becomes the prompt, every other
    /// `user`/`assistant` message goes into the history in order.
    pub fn from_messages(messages: &[ChatMessage]) -> Result<Self, ValidationError> {
        let mut structure = Self::default();
        let last = messages.len().checked_sub(1);
        let mut contexts: Vec<&str> = Vec::new();

        for (idx, message) in messages.iter().enumerate() {
            match message.name.as_deref() {
                Some(EXAMPLE_USER) => {
                    let reply = messages[idx + 1..]
                        .iter()
                        .find(|m| m.name.as_deref() == Some(EXAMPLE_ASSISTANT))
                        .ok_or(ValidationError::UnpairedExample(idx))?;
                    structure
                        .examples
                        .push(Example::new(message.content.clone(), reply.content.clone()));
                    continue;
                }
                Some(EXAMPLE_ASSISTANT) => continue,
                _ => {}
            }

            match message.role.as_str() {
                "system" => contexts.push(&message.content),
                "user" if Some(idx) == last => structure.prompt = Some(message.content.clone()),
                "user" => structure.chat_history.push(ChatTurn::user(message.content.clone())),
                "assistant" => structure
                    .chat_history
                    .push(ChatTurn::assistant(message.content.clone())),
                other => {
                    return Err(ValidationError::UnsupportedRole {
                        role: other.to_string(),
                        index: idx,
                    })
                }
            }
        }

        if !contexts.is_empty() {
            structure.context = Some(contexts.join("\n"));
        }

        Ok(structure)
    }
}

/// A role-tagged message as sent by chat-style callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// The part of a [`PromptStructure`] that fits within an input-token limit.
///
/// `chat_history` is oldest-kept-first and always has even length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimmedConversation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

impl TrimmedConversation {
    /// True when nothing survived trimming.
    pub fn is_empty(&self) -> bool {
        self.context.is_none()
            && self.prompt.is_none()
            && self.examples.is_empty()
            && self.chat_history.is_empty()
    }

    /// Turn the trimmed result back into an input structure.
    pub fn into_prompt(self) -> PromptStructure {
        PromptStructure {
            context: self.context,
            prompt: self.prompt,
            examples: self.examples,
            chat_history: self.chat_history,
        }
    }
}
