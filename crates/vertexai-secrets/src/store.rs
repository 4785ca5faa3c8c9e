//! Scope-partitioned secret storage.
//!
//! Defines the [`SecretStore`] trait and [`FileSecretStore`], which keeps each
//! secret as an encrypted JSON file at `<base_dir>/<scope>/<name>.json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vertexai_core::SecretString;

use crate::crypto::{self, Sealed};
use crate::error::{Result, SecretError};
use crate::master_key::{write_private, MasterKey};

/// Maximum allowed length for a secret name or scope key.
const MAX_NAME_LEN: usize = 128;

/// Scope used when the caller supplies none.
pub const DEFAULT_SCOPE: &str = "administration";

/// Metadata about a stored secret. Never carries the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEntry {
    pub scope: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Async trait for secret storage backends.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Encrypt and store `value` under `scope/name`, replacing any previous value.
    async fn set(&self, scope: &str, name: &str, value: &str) -> Result<()>;

    /// Retrieve and decrypt `scope/name`.
    async fn get(&self, scope: &str, name: &str) -> Result<SecretString>;

    async fn exists(&self, scope: &str, name: &str) -> Result<bool>;

    /// List secrets in one scope, sorted by name.
    async fn list(&self, scope: &str) -> Result<Vec<SecretEntry>>;

    async fn delete(&self, scope: &str, name: &str) -> Result<()>;
}

/// On-disk representation of an encrypted secret.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSecret {
    /// `nonce || ciphertext || tag`, base64.
    encrypted_value: String,
    /// HKDF salt, hex.
    salt: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredSecret {
    fn sealed(&self) -> Result<Sealed> {
        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(&self.encrypted_value)
            .map_err(|e| SecretError::DecryptionFailed(format!("base64 decode failed: {e}")))?;
        let salt = hex::decode(&self.salt)
            .map_err(|e| SecretError::DecryptionFailed(format!("hex decode failed: {e}")))?;
        Ok(Sealed { ciphertext, salt })
    }
}

/// A file-system-backed secret store.
pub struct FileSecretStore {
    base_dir: PathBuf,
    master_key: MasterKey,
}

impl FileSecretStore {
    pub fn new(base_dir: PathBuf, master_key: MasterKey) -> Self {
        Self {
            base_dir,
            master_key,
        }
    }

    /// Open the vault at `base_dir`, resolving its master key.
    pub fn open(base_dir: PathBuf) -> Result<Self> {
        let master_key = MasterKey::resolve(&base_dir)?;
        Ok(Self::new(base_dir, master_key))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    async fn ensure_dir(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            for d in [self.base_dir.as_path(), dir] {
                tokio::fs::set_permissions(d, std::fs::Permissions::from_mode(0o700)).await?;
            }
        }

        Ok(())
    }

    fn scope_dir(&self, scope: &str) -> Result<PathBuf> {
        validate_scope(scope)?;
        Ok(self.base_dir.join(scope))
    }

    fn secret_path(&self, scope: &str, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.scope_dir(scope)?.join(format!("{name}.json")))
    }

    async fn read_stored(path: &Path) -> Result<StoredSecret> {
        let data = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&data)?)
    }
}

fn validate_identifier(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Err("must not be empty".to_string());
    }
    if value.len() > MAX_NAME_LEN {
        return Err(format!("exceeds maximum length of {MAX_NAME_LEN} characters"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(format!(
            "contains invalid characters (allowed: alphanumeric, underscore, hyphen): {value}"
        ));
    }
    Ok(())
}

/// Secret names: ASCII alphanumeric, underscore, hyphen; at most 128 chars.
pub fn validate_name(name: &str) -> Result<()> {
    validate_identifier(name).map_err(|e| SecretError::InvalidName(format!("name {e}")))
}

/// Scope keys follow the same rules as names.
pub fn validate_scope(scope: &str) -> Result<()> {
    validate_identifier(scope).map_err(|e| SecretError::InvalidScope(format!("scope {e}")))
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn set(&self, scope: &str, name: &str, value: &str) -> Result<()> {
        let path = self.secret_path(scope, name)?;
        self.ensure_dir(&self.scope_dir(scope)?).await?;

        let now = Utc::now();
        let created_at = if path.exists() {
            match Self::read_stored(&path).await {
                Ok(previous) => previous.created_at,
                Err(e) => {
                    warn!(path = %path.display(), "replacing unreadable secret file: {e}");
                    now
                }
            }
        } else {
            now
        };

        let sealed = crypto::seal(&self.master_key, value.as_bytes())?;
        let stored = StoredSecret {
            encrypted_value: base64::engine::general_purpose::STANDARD.encode(&sealed.ciphertext),
            salt: hex::encode(&sealed.salt),
            created_at,
            updated_at: now,
        };

        let json = serde_json::to_string_pretty(&stored)?;
        debug!(scope, name, path = %path.display(), "writing secret");
        write_private(&path, json.as_bytes())?;
        Ok(())
    }

    async fn get(&self, scope: &str, name: &str) -> Result<SecretString> {
        let path = self.secret_path(scope, name)?;
        if !path.exists() {
            return Err(SecretError::not_found(scope, name));
        }

        let stored = Self::read_stored(&path).await?;
        let plaintext = crypto::open(&self.master_key, &stored.sealed()?)?;
        let value = std::str::from_utf8(&plaintext)
            .map_err(|e| SecretError::DecryptionFailed(format!("invalid UTF-8: {e}")))?;

        debug!(scope, name, "read secret");
        Ok(SecretString::new(value))
    }

    async fn exists(&self, scope: &str, name: &str) -> Result<bool> {
        Ok(self.secret_path(scope, name)?.exists())
    }

    async fn list(&self, scope: &str) -> Result<Vec<SecretEntry>> {
        let dir = self.scope_dir(scope)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&dir).await?;

        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            match Self::read_stored(&path).await {
                Ok(stored) => entries.push(SecretEntry {
                    scope: scope.to_string(),
                    name,
                    created_at: stored.created_at,
                    updated_at: stored.updated_at,
                }),
                Err(e) => warn!(path = %path.display(), "skipping malformed secret file: {e}"),
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn delete(&self, scope: &str, name: &str) -> Result<()> {
        let path = self.secret_path(scope, name)?;
        if !path.exists() {
            return Err(SecretError::not_found(scope, name));
        }

        debug!(scope, name, path = %path.display(), "deleting secret");
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (FileSecretStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = FileSecretStore::new(tmp.path().to_path_buf(), MasterKey::generate());
        (store, tmp)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _tmp) = test_store();
        store.set(DEFAULT_SCOPE, "vertex_sa", r#"{"type":"service_account"}"#).await.unwrap();

        let secret = store.get(DEFAULT_SCOPE, "vertex_sa").await.unwrap();
        assert_eq!(secret.expose_secret(), r#"{"type":"service_account"}"#);
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let (store, _tmp) = test_store();
        store.set("team-a", "key", "a").await.unwrap();
        store.set("team-b", "key", "b").await.unwrap();

        assert_eq!(store.get("team-a", "key").await.unwrap().expose_secret(), "a");
        assert_eq!(store.get("team-b", "key").await.unwrap().expose_secret(), "b");
        assert!(matches!(
            store.get(DEFAULT_SCOPE, "key").await,
            Err(SecretError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let (store, _tmp) = test_store();
        store.set(DEFAULT_SCOPE, "beta", "b").await.unwrap();
        store.set(DEFAULT_SCOPE, "alpha", "a").await.unwrap();
        store.set("other", "gamma", "g").await.unwrap();

        let entries = store.list(DEFAULT_SCOPE).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(store.list("empty-scope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_created_at() {
        let (store, _tmp) = test_store();
        store.set(DEFAULT_SCOPE, "key", "old").await.unwrap();
        let before = store.list(DEFAULT_SCOPE).await.unwrap()[0].clone();

        store.set(DEFAULT_SCOPE, "key", "new").await.unwrap();
        let after = store.list(DEFAULT_SCOPE).await.unwrap()[0].clone();

        assert_eq!(store.get(DEFAULT_SCOPE, "key").await.unwrap().expose_secret(), "new");
        assert_eq!(before.created_at, after.created_at);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _tmp) = test_store();
        store.set(DEFAULT_SCOPE, "gone", "x").await.unwrap();
        store.delete(DEFAULT_SCOPE, "gone").await.unwrap();
        assert!(!store.exists(DEFAULT_SCOPE, "gone").await.unwrap());
        assert!(matches!(
            store.delete(DEFAULT_SCOPE, "gone").await,
            Err(SecretError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_other_master_key_cannot_read() {
        let tmp = TempDir::new().unwrap();
        let writer = FileSecretStore::new(tmp.path().to_path_buf(), MasterKey::generate());
        writer.set(DEFAULT_SCOPE, "key", "value").await.unwrap();

        let reader = FileSecretStore::new(tmp.path().to_path_buf(), MasterKey::generate());
        assert!(matches!(
            reader.get(DEFAULT_SCOPE, "key").await,
            Err(SecretError::DecryptionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let (store, _tmp) = test_store();
        store.set(DEFAULT_SCOPE, "key", "value").await.unwrap();
        let path = store.secret_path(DEFAULT_SCOPE, "key").unwrap();
        tokio::fs::write(&path, r#"{"encrypted_value":"!!","salt":"zz","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}"#)
            .await
            .unwrap();
        assert!(matches!(
            store.get(DEFAULT_SCOPE, "key").await,
            Err(SecretError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_identifier_validation() {
        assert!(validate_name("vertex_sa-1").is_ok());
        assert!(matches!(validate_name(""), Err(SecretError::InvalidName(_))));
        assert!(matches!(
            validate_name(&"a".repeat(MAX_NAME_LEN + 1)),
            Err(SecretError::InvalidName(_))
        ));
        assert!(matches!(validate_name("dots.bad"), Err(SecretError::InvalidName(_))));
        assert!(matches!(validate_scope("../etc"), Err(SecretError::InvalidScope(_))));
        assert!(matches!(validate_scope(""), Err(SecretError::InvalidScope(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _tmp) = test_store();
        store.set(DEFAULT_SCOPE, "perm_test", "value").await.unwrap();

        let path = store.secret_path(DEFAULT_SCOPE, "perm_test").unwrap();
        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
