//! AES-256-GCM sealing with per-secret HKDF-SHA256 keys.
//!
//! The master key never encrypts anything directly. Each sealed value carries
//! its own random salt, and the nonce travels in front of the ciphertext.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Result, SecretError};
use crate::master_key::MasterKey;

const NONCE_SIZE: usize = 12;
const SALT_SIZE: usize = 32;
const KEY_SIZE: usize = 32;

/// Domain separation for derived keys.
const HKDF_INFO: &[u8] = b"vertexai-vault-v1";

/// Ciphertext (`nonce || ciphertext || tag`) plus the salt its key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub salt: Vec<u8>,
}

fn derive_key(master: &MasterKey, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), master.as_bytes());
    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(HKDF_INFO, &mut okm[..])
        .map_err(|e| SecretError::EncryptionFailed(format!("key derivation failed: {e}")))?;
    Ok(okm)
}

/// Encrypt `plaintext` under a fresh salt and nonce.
pub fn seal(master: &MasterKey, plaintext: &[u8]) -> Result<Sealed> {
    let mut salt = vec![0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let key = derive_key(master, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| SecretError::EncryptionFailed(e.to_string()))?;
    let body = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| SecretError::EncryptionFailed(e.to_string()))?;

    let mut ciphertext = Vec::with_capacity(NONCE_SIZE + body.len());
    ciphertext.extend_from_slice(&nonce_bytes);
    ciphertext.extend_from_slice(&body);

    Ok(Sealed { ciphertext, salt })
}

/// Decrypt a value produced by [`seal`]. Fails on any tampering or key mismatch.
pub fn open(master: &MasterKey, sealed: &Sealed) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.ciphertext.len() < NONCE_SIZE {
        return Err(SecretError::DecryptionFailed("ciphertext too short".to_string()));
    }
    let (nonce_bytes, body) = sealed.ciphertext.split_at(NONCE_SIZE);

    let key = derive_key(master, &sealed.salt)
        .map_err(|e| SecretError::DecryptionFailed(e.to_string()))?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| SecretError::DecryptionFailed(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), body)
        .map(Zeroizing::new)
        .map_err(|_| SecretError::DecryptionFailed("authentication failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let master = MasterKey::generate();
        let sealed = seal(&master, br#"{"type":"service_account"}"#).unwrap();
        let opened = open(&master, &sealed).unwrap();
        assert_eq!(opened.as_slice(), br#"{"type":"service_account"}"#);
    }

    #[test]
    fn test_wrong_master_key_fails() {
        let sealed = seal(&MasterKey::generate(), b"sensitive").unwrap();
        let err = open(&MasterKey::generate(), &sealed).unwrap_err();
        assert!(matches!(err, SecretError::DecryptionFailed(_)));
    }

    #[test]
    fn test_tampering_is_detected() {
        let master = MasterKey::generate();
        let mut sealed = seal(&master, b"important").unwrap();
        sealed.ciphertext[NONCE_SIZE + 1] ^= 0xff;
        assert!(open(&master, &sealed).is_err());

        let mut sealed = seal(&master, b"important").unwrap();
        sealed.salt[0] ^= 0x01;
        assert!(open(&master, &sealed).is_err());
    }

    #[test]
    fn test_truncated_ciphertext() {
        let master = MasterKey::generate();
        let sealed = Sealed {
            ciphertext: vec![0u8; 4],
            salt: vec![0u8; SALT_SIZE],
        };
        assert!(matches!(
            open(&master, &sealed),
            Err(SecretError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_fresh_salt_per_seal() {
        let master = MasterKey::generate();
        let a = seal(&master, b"same").unwrap();
        let b = seal(&master, b"same").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.ciphertext, b.ciphertext);
    }
}
