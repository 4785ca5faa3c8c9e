//! # vertexai-core
//!
//! Core types, configuration, and the token-budget pipeline for the Vertex AI
//! integration.
//!
//! - **Types**: prompt structures, trimmed conversations, model descriptors
//! - **Context**: the reference tokenizer and the conversation budgeter
//! - **Configuration**: versioned integration settings and the JSON5 config file
//! - **Secrets**: zeroizing credential strings and vault-reference fields

pub mod config;
pub mod context;
pub mod error;
pub mod paths;
pub mod secret;
pub mod types;

pub use config::{Config, DispatchMode, IntegrationSettings, SettingsOverrides, ValidatedSettings};
pub use context::{default_tokenizer, ConversationBudgeter, TokenItem, Tokenizer};
pub use error::{ConfigError, Error, Result, ValidationError};
pub use secret::{SecretField, SecretString};
pub use types::*;
