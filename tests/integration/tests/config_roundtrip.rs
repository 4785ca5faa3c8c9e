//! Config save/load roundtrip tests.
//!
//! These verify that the config file survives a trip to disk and that
//! hand-written JSON5 files load with their aliases and comments.

use std::path::Path;
use tempfile::TempDir;
use vertexai_core::{Config, DispatchMode, SecretField};

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vertexai.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.integration, config.integration);
    assert!(loaded.secrets.dir.is_none());
}

#[test]
fn test_config_modify_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vertexai.json5");

    let mut config = Config::default();
    config.integration.project = "acme".to_string();
    config.integration.location = "us-central1".to_string();
    config.integration.model_name = "chat-bison@002".to_string();
    config.integration.service_account_info = Some(SecretField::reference("vertex_sa"));
    config.integration.input_token_limit = Some(2048);
    config.secrets.dir = Some(dir.path().join("secrets"));
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.integration.input_token_limit, Some(2048));
    assert_eq!(
        loaded.integration.service_account_info,
        Some(SecretField::reference("vertex_sa"))
    );
    assert_eq!(loaded.secrets_dir().unwrap(), dir.path().join("secrets"));

    let settings = loaded.validate().unwrap();
    assert_eq!(settings.model_name, "chat-bison@002");
}

#[test]
fn test_hand_written_json5() {
    let config = Config::parse(
        r#"{
            // legacy field names still load
            integration: {
                project: "acme",
                zone: "europe-west4",
                model_name: "text-bison",
                max_decode_steps: 64,
                dispatch: "legacy_prefix",
                service_account_info: { from_secrets: true, value: "{{secret.vertex_sa}}" },
            },
            logging: { filter: "vertexai=debug" },
        }"#,
    )
    .unwrap();

    assert_eq!(config.integration.location, "europe-west4");
    assert_eq!(config.integration.max_output_tokens, 64);
    assert_eq!(config.integration.dispatch, DispatchMode::LegacyPrefix);
    assert_eq!(config.logging.filter.as_deref(), Some("vertexai=debug"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_config_does_not_validate() {
    let err = Config::default().validate().unwrap_err().to_string();
    assert!(err.contains("project must not be empty"));
    assert!(err.contains("service_account_info must be set"));
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/vertexai.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}
