//! # vertexai-providers
//!
//! Everything between a trimmed conversation and the network:
//!
//! - [`registry`]: model descriptors and per-family token limits
//! - [`assembler`]: chat vs. completion request shapes
//! - [`client`]: the authenticated Vertex AI REST client
//! - [`normalizer`]: canonical response envelopes, whole or streamed

pub mod assembler;
pub mod client;
pub mod credentials;
pub mod error;
pub mod normalizer;
pub mod registry;
pub mod types;

pub use assembler::{completion_prompt, RequestAssembler};
pub use client::{ClientFactory, ClientTarget, ProviderClient, VertexClient, VertexClientFactory};
pub use credentials::{Credentials, TokenSource};
pub use error::{ProviderError, Result};
pub use normalizer::{normalize, normalize_prediction, normalize_stream, FINISH_STOP};
pub use registry::{
    descriptors_from_discovery, seed_token_limits, ModelRegistry, RegistrySnapshot,
    TokenLimitTable, CHAT_PREFIX, TOKEN_LIMITS_SECRET,
};
pub use types::*;
