//! Model descriptor and capability types.

use serde::{Deserialize, Serialize};

/// What a model can be used for.
///
/// Every flag defaults to `true`; discovery only ever narrows capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelCapabilities {
    #[serde(default = "default_true")]
    pub completion: bool,

    #[serde(default = "default_true")]
    pub chat_completion: bool,

    #[serde(default = "default_true")]
    pub embeddings: bool,
}

fn default_true() -> bool {
    true
}

impl ModelCapabilities {
    /// All capabilities enabled.
    pub const fn all() -> Self {
        Self {
            completion: true,
            chat_completion: true,
            embeddings: true,
        }
    }

    /// No capabilities.
    pub const fn none() -> Self {
        Self {
            completion: false,
            chat_completion: false,
            embeddings: false,
        }
    }
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Per-request token ceilings for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenLimit {
    pub input: usize,
    pub output: usize,
}

impl TokenLimit {
    /// Limit applied when nothing more specific is known.
    pub const DEFAULT: Self = Self {
        input: 8192,
        output: 1024,
    };

    pub const fn new(input: usize, output: usize) -> Self {
        Self { input, output }
    }
}

impl Default for TokenLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything the pipeline needs to know about one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier, optionally versioned (`chat-bison@002`).
    pub id: String,

    /// Display name.
    pub name: String,

    #[serde(default)]
    pub capabilities: ModelCapabilities,

    #[serde(default)]
    pub token_limit: TokenLimit,
}

impl ModelDescriptor {
    /// A descriptor with default capabilities and limits, named after its id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            capabilities: ModelCapabilities::default(),
            token_limit: TokenLimit::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: ModelCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_token_limit(mut self, token_limit: TokenLimit) -> Self {
        self.token_limit = token_limit;
        self
    }

    /// Family prefix of this descriptor's id.
    pub fn family(&self) -> &str {
        model_family(&self.id)
    }
}

/// The family part of a model id: the text before the first `@`.
pub fn model_family(id: &str) -> &str {
    id.split('@').next().unwrap_or(id)
}
