//! Zeroizing string wrapper for credentials.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Plaintext credential material that is wiped from memory on drop.
///
/// Service-account JSON, refresh tokens and bearer tokens all travel through
/// the pipeline wrapped in this type so they never show up in logs.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    inner: String,
}

impl SecretString {
    /// Wrap a plaintext value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Borrow the plaintext. Keep the borrow as short as possible.
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// Parse the plaintext as JSON without copying it into an unprotected `String`.
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.inner)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(self.inner.as_bytes(), other.inner.as_bytes())
    }
}

impl Eq for SecretString {}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.inner.serialize(serializer)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A settings value that is either given inline or refers to a vault entry.
///
/// Serialized as a plain string, or as
/// `{"from_secrets": true, "value": "{{secret.NAME}}"}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretField {
    Reference { from_secrets: bool, value: String },
    Plain(SecretString),
}

impl SecretField {
    /// An inline value.
    pub fn plain(value: impl Into<String>) -> Self {
        Self::Plain(SecretString::new(value))
    }

    /// A reference to the vault entry `name`.
    pub fn reference(name: &str) -> Self {
        Self::Reference {
            from_secrets: true,
            value: format!("{{{{secret.{}}}}}", name),
        }
    }

    /// True if the value must be looked up in the vault.
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference { from_secrets: true, .. })
    }

    /// True if there is nothing to reveal.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Plain(value) => value.is_empty(),
            Self::Reference { value, .. } => value.trim().is_empty(),
        }
    }
}

impl fmt::Debug for SecretField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("SecretField::Plain([REDACTED])"),
            Self::Reference { value, .. } => write!(f, "SecretField::Reference({})", value),
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
