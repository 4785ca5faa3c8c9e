//! Shared fixtures for the cross-crate tests.
//!
//! Everything here talks to a [`wiremock`] server standing in for both the
//! OAuth token endpoint and the Vertex AI REST API.

use std::sync::Arc;

use tempfile::TempDir;
use vertexai_core::{IntegrationSettings, SecretField};
use vertexai_secrets::{FileSecretStore, MasterKey, SecretStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PROJECT: &str = "acme";
pub const LOCATION: &str = "us-central1";
pub const CREDENTIALS_SECRET: &str = "vertex_sa";
pub const ACCESS_TOKEN: &str = "it-token";

/// Path of a publisher model call, e.g. `model_path("chat-bison", "predict")`.
pub fn model_path(model: &str, verb: &str) -> String {
    format!(
        "/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
        PROJECT, LOCATION, model, verb
    )
}

/// Path of the model listing.
pub fn models_path() -> String {
    format!("/v1/projects/{}/locations/{}/models", PROJECT, LOCATION)
}

/// Serve access tokens from `/token`.
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": ACCESS_TOKEN,
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

/// An `authorized_user` credentials blob whose token endpoint is `server`.
pub fn authorized_user(server: &MockServer) -> String {
    serde_json::json!({
        "type": "authorized_user",
        "client_id": "it-client",
        "client_secret": "it-secret",
        "refresh_token": "it-refresh",
        "token_uri": format!("{}/token", server.uri()),
    })
    .to_string()
}

/// Settings for `model` that point at `server` and read credentials from the vault.
pub fn settings(server: &MockServer, model: &str) -> IntegrationSettings {
    IntegrationSettings {
        project: PROJECT.to_string(),
        location: LOCATION.to_string(),
        service_account_info: Some(SecretField::reference(CREDENTIALS_SECRET)),
        model_name: model.to_string(),
        api_endpoint: Some(server.uri()),
        ..IntegrationSettings::default()
    }
}

/// A fresh vault holding the credentials for `server` under `scope`.
pub async fn vault(server: &MockServer, scope: &str) -> (Arc<FileSecretStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = FileSecretStore::new(dir.path().join("secrets"), MasterKey::generate());
    store
        .set(scope, CREDENTIALS_SECRET, &authorized_user(server))
        .await
        .unwrap();
    (Arc::new(store), dir)
}
