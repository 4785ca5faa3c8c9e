//! Master key resolution.
//!
//! Resolution order:
//! 1. `VERTEXAI_MASTER_KEY` environment variable (hex, 32 bytes)
//! 2. `<secrets_dir>/master.key` (hex, created with mode 0600 on first use)

use rand::RngCore;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, SecretError};

/// Environment variable holding a hex-encoded master key.
pub const ENV_VAR: &str = "VERTEXAI_MASTER_KEY";

/// Key file name inside the vault directory.
pub const KEY_FILE: &str = "master.key";

const KEY_LEN: usize = 32;

/// The vault's 256-bit master key. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// A fresh random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    /// Decode a hex-encoded key. `source` names where it came from, for errors.
    pub fn from_hex(hex_key: &str, source: &str) -> Result<Self> {
        let mut bytes = hex::decode(hex_key.trim())
            .map_err(|e| SecretError::MasterKey(format!("invalid hex in {source}: {e}")))?;
        if bytes.len() != KEY_LEN {
            let len = bytes.len();
            bytes.zeroize();
            return Err(SecretError::MasterKey(format!(
                "{source} must decode to exactly {KEY_LEN} bytes, got {len}"
            )));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Resolve the master key for the vault at `secrets_dir`.
    pub fn resolve(secrets_dir: &Path) -> Result<Self> {
        let env_value = std::env::var(ENV_VAR).ok().filter(|v| !v.trim().is_empty());
        Self::resolve_with(env_value.as_deref(), secrets_dir)
    }

    /// Resolution with the environment value passed in explicitly.
    pub fn resolve_with(env_value: Option<&str>, secrets_dir: &Path) -> Result<Self> {
        if let Some(hex_key) = env_value {
            debug!("using master key from {}", ENV_VAR);
            return Self::from_hex(hex_key, ENV_VAR);
        }

        let path = secrets_dir.join(KEY_FILE);
        if path.exists() {
            debug!(path = %path.display(), "using master key file");
            let content = zeroize::Zeroizing::new(fs::read_to_string(&path)?);
            return Self::from_hex(&content, KEY_FILE);
        }

        info!(path = %path.display(), "generating new vault master key");
        let key = Self::generate();
        fs::create_dir_all(secrets_dir)?;
        write_private(&path, key.to_hex().as_bytes())?;
        Ok(key)
    }
}

/// Write `data` to `path` with mode 0600 on Unix.
pub(crate) fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::write(path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
