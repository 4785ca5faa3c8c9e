//! Model registry.
//!
//! The registry is a read-mostly snapshot: readers take an `Arc` to the
//! current [`RegistrySnapshot`] and never observe a partial update, and a
//! refresh builds a whole new snapshot before swapping the pointer.
//!
//! The `RwLock` guards only the pointer. It is held for one `Arc` clone on
//! read and one assignment on write, never while a snapshot is built or
//! searched, so lookups against a held snapshot take no lock at all.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use vertexai_core::{model_family, ModelCapabilities, ModelDescriptor, TokenLimit};
use vertexai_secrets::{SecretStore, DEFAULT_SCOPE};

use crate::error::{ProviderError, Result};
use crate::types::RawModel;

/// Vault key holding the per-family token-limit table.
pub const TOKEN_LIMITS_SECRET: &str = "vertex_ai_token_limits";

/// Current table format version.
pub const TOKEN_LIMITS_VERSION: u32 = 1;

/// Family prefix that marks chat models in legacy dispatch.
pub const CHAT_PREFIX: &str = "chat";

/// Versioned map from model family to token limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLimitTable {
    pub version: u32,
    pub limits: BTreeMap<String, TokenLimit>,
}

impl Default for TokenLimitTable {
    fn default() -> Self {
        let entries = [
            ("text-bison", 8192, 1024),
            ("chat-bison", 8192, 1024),
            ("code-bison", 6144, 1024),
            ("codechat-bison", 6144, 1024),
            ("code-gecko", 2048, 64),
            ("text-bison-32k", 32000, 8192),
            ("chat-bison-32k", 32000, 8192),
            ("code-bison-32k", 32000, 8192),
            ("codechat-bison-32k", 32000, 8192),
        ];
        Self {
            version: TOKEN_LIMITS_VERSION,
            limits: entries
                .into_iter()
                .map(|(family, input, output)| (family.to_string(), TokenLimit::new(input, output)))
                .collect(),
        }
    }
}

impl TokenLimitTable {
    pub fn empty() -> Self {
        Self {
            version: TOKEN_LIMITS_VERSION,
            limits: BTreeMap::new(),
        }
    }

    /// Limit for the family of `model_id`, if the table has one.
    pub fn lookup(&self, model_id: &str) -> Option<TokenLimit> {
        self.limits.get(model_family(model_id)).copied()
    }

    /// Read the table from the vault. A missing entry yields the defaults.
    pub async fn load(store: &dyn SecretStore) -> Result<Self> {
        if !store.exists(DEFAULT_SCOPE, TOKEN_LIMITS_SECRET).await? {
            debug!("token-limit table not in vault, using defaults");
            return Ok(Self::default());
        }
        let raw = store.get(DEFAULT_SCOPE, TOKEN_LIMITS_SECRET).await?;
        let table: Self = raw.parse_json()?;
        if table.version != TOKEN_LIMITS_VERSION {
            return Err(ProviderError::validation(format!(
                "unsupported token-limit table version {}",
                table.version
            )));
        }
        Ok(table)
    }
}

/// Write the default table to the vault unless one is already there.
///
/// Returns `true` when the table was written.
pub async fn seed_token_limits(store: &dyn SecretStore) -> Result<bool> {
    if store.exists(DEFAULT_SCOPE, TOKEN_LIMITS_SECRET).await? {
        debug!("token-limit table already present, leaving it untouched");
        return Ok(false);
    }
    let json = serde_json::to_string(&TokenLimitTable::default())?;
    store.set(DEFAULT_SCOPE, TOKEN_LIMITS_SECRET, &json).await?;
    info!(key = TOKEN_LIMITS_SECRET, "seeded token-limit table");
    Ok(true)
}

/// An immutable view of known models and family limits.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    descriptors: HashMap<String, ModelDescriptor>,
    limits: TokenLimitTable,
}

impl RegistrySnapshot {
    pub fn new(descriptors: Vec<ModelDescriptor>, limits: TokenLimitTable) -> Self {
        Self {
            descriptors: descriptors.into_iter().map(|d| (d.id.clone(), d)).collect(),
            limits,
        }
    }

    /// Exact descriptor, else family-table limit, else the default limit.
    pub fn resolve(&self, model_id: &str) -> ModelDescriptor {
        if let Some(descriptor) = self.descriptors.get(model_id) {
            return descriptor.clone();
        }
        let limit = self.limits.lookup(model_id).unwrap_or_default();
        ModelDescriptor::new(model_id)
            .with_capabilities(ModelCapabilities::all())
            .with_token_limit(limit)
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.descriptors.get(model_id)
    }

    /// Known descriptors, sorted by id.
    pub fn descriptors(&self) -> Vec<ModelDescriptor> {
        let mut all: Vec<ModelDescriptor> = self.descriptors.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn limits(&self) -> &TokenLimitTable {
        &self.limits
    }
}

/// Process-wide registry holding the current snapshot.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl ModelRegistry {
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The current snapshot. Hold it for the duration of one request.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().clone()
    }

    /// Swap in a new snapshot wholesale.
    pub fn replace(&self, snapshot: RegistrySnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }

    /// Build a snapshot from `descriptors` and `limits` and swap it in.
    pub fn refresh(&self, descriptors: Vec<ModelDescriptor>, limits: TokenLimitTable) {
        let count = descriptors.len();
        self.replace(RegistrySnapshot::new(descriptors, limits));
        info!(models = count, "model registry refreshed");
    }

    pub fn resolve(&self, model_id: &str) -> ModelDescriptor {
        self.snapshot().resolve(model_id)
    }

    /// Whether `model_name` belongs to the chat family by name alone.
    pub fn resolve_prefix(&self, model_name: &str) -> bool {
        model_name.starts_with(CHAT_PREFIX)
    }
}

/// Turn discovery output into descriptors.
///
/// Limits come from `limits`; capability flags default to all-true unless
/// `known` already carries a descriptor with the same id. Known descriptors
/// that discovery did not return are kept.
pub fn descriptors_from_discovery(
    raw: &[RawModel],
    limits: &TokenLimitTable,
    known: &[ModelDescriptor],
) -> Vec<ModelDescriptor> {
    let mut out: Vec<ModelDescriptor> = raw
        .iter()
        .map(|model| {
            let id = model.id();
            match known.iter().find(|k| k.id == id) {
                Some(existing) => {
                    let mut descriptor = existing.clone();
                    if !model.display_name.is_empty() {
                        descriptor.name = model.display_name.clone();
                    }
                    descriptor
                }
                None => {
                    let mut descriptor = ModelDescriptor::new(id)
                        .with_token_limit(limits.lookup(id).unwrap_or_default());
                    if !model.display_name.is_empty() {
                        descriptor.name = model.display_name.clone();
                    }
                    descriptor
                }
            }
        })
        .collect();

    for existing in known {
        if !out.iter().any(|d| d.id == existing.id) {
            out.push(existing.clone());
        }
    }
    out
}
