//! Encrypted secret vault for the Vertex AI integration.
//!
//! Secrets are AES-256-GCM sealed, partitioned by scope key, and revealed
//! through a [`SecretResolver`] when settings refer to them.

pub mod crypto;
pub mod error;
pub mod master_key;
pub mod resolver;
pub mod store;

pub use error::{Result, SecretError};
pub use master_key::MasterKey;
pub use resolver::{parse_reference, SecretResolver, VaultResolver};
pub use store::{FileSecretStore, SecretEntry, SecretStore, DEFAULT_SCOPE};
