//! Integration registration metadata.

use semver::Version;
use serde::{Deserialize, Serialize};

/// Name the host registers this integration under.
pub const INTEGRATION_NAME: &str = "vertex_ai";

/// Host section the integration appears in.
pub const SECTION_NAME: &str = "ai";

/// Operation families the integration serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationCapability {
    CheckSettings,
    GetModels,
    CountTokens,
    LlmInvoke,
    LlmStream,
    ChatInvoke,
    ChatStream,
    EmbedDocuments,
    EmbedQuery,
    IndexerConfig,
}

impl IntegrationCapability {
    pub const ALL: [Self; 10] = [
        Self::CheckSettings,
        Self::GetModels,
        Self::CountTokens,
        Self::LlmInvoke,
        Self::LlmStream,
        Self::ChatInvoke,
        Self::ChatStream,
        Self::EmbedDocuments,
        Self::EmbedQuery,
        Self::IndexerConfig,
    ];
}

/// Describes the integration to its host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationMetadata {
    pub name: String,
    pub section: String,
    pub description: String,
    #[serde(with = "version_serde")]
    pub version: Version,
    pub capabilities: Vec<IntegrationCapability>,
}

impl IntegrationMetadata {
    /// Metadata for this build.
    pub fn current() -> Self {
        Self {
            name: INTEGRATION_NAME.to_string(),
            section: SECTION_NAME.to_string(),
            description: "Google Vertex AI text, chat, and embedding models".to_string(),
            version: Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0)),
            capabilities: IntegrationCapability::ALL.to_vec(),
        }
    }
}

mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        version.to_string().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}
