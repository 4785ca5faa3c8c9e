//! OAuth2 credential exchange for Google Cloud.
//!
//! Supports service-account keys (RS256-signed JWT bearer grant) and
//! authorized-user credentials (refresh-token grant). Access tokens are cached
//! until shortly before they expire.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use vertexai_core::SecretString;

use crate::error::{ProviderError, Result};

/// Default OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scope requested for every access token.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_LIFETIME_SECS: i64 = 3600;

/// Tokens this close to expiry are refreshed.
const REFRESH_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Parsed credential blob.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: SecretString,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl Credentials {
    /// Parse a credential JSON blob.
    pub fn parse(blob: &SecretString) -> Result<Self> {
        blob.parse_json()
            .map_err(|e| ProviderError::credential(format!("malformed credentials JSON: {e}")))
    }

    pub fn token_uri(&self) -> &str {
        match self {
            Self::ServiceAccount(key) => &key.token_uri,
            Self::AuthorizedUser(user) => &user.token_uri,
        }
    }

    /// Project embedded in a service-account key, if any.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::AuthorizedUser(_) => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: SecretString,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Sign the JWT-bearer assertion for a service account.
pub fn service_account_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())
        .map_err(|e| ProviderError::credential(format!("invalid service account private key: {e}")))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let claims = JwtClaims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: now.timestamp() + JWT_LIFETIME_SECS,
    };

    jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|e| ProviderError::credential(format!("failed to sign JWT: {e}")))
}

/// Exchanges credentials for bearer tokens and caches them.
pub struct TokenSource {
    http: Client,
    credentials: Credentials,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenSource {
    pub fn new(http: Client, credentials: Credentials) -> Self {
        Self {
            http,
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// A bearer token, refreshed if the cached one is missing or about to expire.
    pub async fn bearer(&self) -> Result<SecretString> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.exchange(now).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        let request = match &self.credentials {
            Credentials::ServiceAccount(key) => {
                debug!(client_email = %key.client_email, "exchanging service account assertion");
                let assertion = service_account_assertion(key, now)?;
                self.http.post(&key.token_uri).form(&[
                    ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                    ("assertion", assertion.as_str()),
                ])
            }
            Credentials::AuthorizedUser(user) => {
                debug!(client_id = %user.client_id, "exchanging refresh token");
                self.http.post(&user.token_uri).form(&[
                    ("grant_type", "refresh_token"),
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.expose_secret()),
                    ("refresh_token", user.refresh_token.expose_secret()),
                ])
            }
        };

        let response = request.send().await.map_err(|e| {
            ProviderError::connection(format!(
                "token endpoint {} unreachable: {e}",
                self.credentials.token_uri()
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "token exchange rejected");
            return Err(ProviderError::connection(format!(
                "token endpoint rejected credentials ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::connection(format!("malformed token response: {e}")))?;

        Ok(AccessToken {
            token: parsed.access_token,
            expires_at: now + Duration::seconds(parsed.expires_in.unwrap_or(JWT_LIFETIME_SECS)),
        })
    }
}
