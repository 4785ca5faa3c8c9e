//! Shared data model.

mod model;
mod prompt;

pub use model::{model_family, ModelCapabilities, ModelDescriptor, TokenLimit};
pub use prompt::{
    ChatMessage, ChatRole, ChatTurn, Example, PromptStructure, TrimmedConversation,
    EXAMPLE_ASSISTANT, EXAMPLE_USER,
};
