//! Token counting and conversation budgeting.

pub mod budget;
pub mod tokenizer;

pub use budget::ConversationBudgeter;
pub use tokenizer::{
    default_tokenizer, Cl100kTokenizer, HeuristicTokenizer, TokenItem, Tokenizer, MESSAGE_OVERHEAD,
};
