//! CLI commands run in-process against a temporary config and vault.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde_json::json;
use tempfile::TempDir;
use vertexai_cli::{run, Cli};
use vertexai_core::{Config, SecretField};
use vertexai_integration_tests::{
    authorized_user, model_path, mount_token_endpoint, CREDENTIALS_SECRET, LOCATION, PROJECT,
};
use vertexai_providers::TOKEN_LIMITS_SECRET;
use vertexai_secrets::{FileSecretStore, SecretStore, DEFAULT_SCOPE};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Write a config whose vault lives in `dir` and whose API calls go to `endpoint`.
fn write_config(dir: &Path, endpoint: &str) -> PathBuf {
    let mut config = Config::default();
    config.integration.project = PROJECT.to_string();
    config.integration.location = LOCATION.to_string();
    config.integration.model_name = "chat-bison@002".to_string();
    config.integration.service_account_info = Some(SecretField::reference(CREDENTIALS_SECRET));
    config.integration.api_endpoint = Some(endpoint.to_string());
    config.secrets.dir = Some(dir.join("secrets"));

    let path = dir.join("vertexai.json5");
    config.save(&path).unwrap();
    path
}

async fn cli(config: &Path, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["vertexai", "-c", config.to_str().unwrap()];
    argv.extend_from_slice(args);
    run(Cli::try_parse_from(argv).unwrap()).await
}

#[tokio::test]
async fn test_secrets_then_invoke() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path(model_path("chat-bison@002", "predict")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{"candidates": [{"author": "1", "content": "pong"}]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());
    let blob = authorized_user(&server);

    cli(&config, &["secrets", "set", CREDENTIALS_SECRET, "--value", &blob])
        .await
        .unwrap();
    cli(&config, &["secrets", "seed-limits"]).await.unwrap();
    cli(&config, &["invoke", "ping"]).await.unwrap();

    let store = FileSecretStore::open(tmp.path().join("secrets")).unwrap();
    assert!(store.exists(DEFAULT_SCOPE, TOKEN_LIMITS_SECRET).await.unwrap());
    assert_eq!(
        store
            .get(DEFAULT_SCOPE, CREDENTIALS_SECRET)
            .await
            .unwrap()
            .expose_secret(),
        blob
    );
}

#[tokio::test]
async fn test_invoke_without_credentials_fails() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    let err = cli(&config, &["invoke", "ping"]).await.unwrap_err();
    assert!(err.to_string().contains(CREDENTIALS_SECRET), "{}", err);
}

#[tokio::test]
async fn test_config_validate_and_tokens() {
    let server = MockServer::start().await;
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &server.uri());

    cli(&config, &["config", "validate"]).await.unwrap();
    cli(&config, &["tokens", "how many tokens is this"]).await.unwrap();

    let broken = tmp.path().join("broken.json5");
    std::fs::write(&broken, "{ integration: { project: \"acme\" } }").unwrap();
    assert!(cli(&broken, &["config", "validate"]).await.is_err());
}
