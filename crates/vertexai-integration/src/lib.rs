//! # vertexai-integration
//!
//! The host-facing surface of the Vertex AI integration. A host builds one
//! [`VertexIntegration`] and either calls its operations directly or sends
//! [`DispatchRequest`]s and receives `{ok, response | error}` results.

pub mod dispatch;
pub mod error;
pub mod input;
pub mod integration;
pub mod metadata;

pub use dispatch::{DispatchError, DispatchRequest, DispatchResult};
pub use error::{IntegrationError, Result};
pub use input::{CountInput, InvocationInput};
pub use integration::{IndexerConfig, IndexerTarget, VertexIntegration};
pub use metadata::{IntegrationCapability, IntegrationMetadata, INTEGRATION_NAME, SECTION_NAME};
