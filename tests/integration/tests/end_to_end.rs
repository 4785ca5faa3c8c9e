//! Full-pipeline tests: vault reference, token exchange, request assembly,
//! REST call and normalization, with a mock server playing Vertex AI.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;
use vertexai_core::context::HeuristicTokenizer;
use vertexai_core::{DispatchMode, PromptStructure, SettingsOverrides};
use vertexai_integration::{
    DispatchRequest, DispatchResult, IntegrationError, InvocationInput, VertexIntegration,
};
use vertexai_integration_tests::{
    mount_token_endpoint, model_path, models_path, settings, vault, ACCESS_TOKEN,
};
use vertexai_providers::{
    seed_token_limits, EnvelopeObject, ModelRegistry, RegistrySnapshot, TokenLimitTable,
    VertexClientFactory,
};
use vertexai_secrets::{SecretStore, VaultResolver, DEFAULT_SCOPE};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn integration(store: Arc<dyn SecretStore>) -> VertexIntegration {
    let registry = ModelRegistry::new(RegistrySnapshot::new(Vec::new(), TokenLimitTable::default()));
    VertexIntegration::new(
        Arc::new(VaultResolver::new(store)),
        Arc::new(VertexClientFactory::new().unwrap()),
        Arc::new(registry),
        Arc::new(HeuristicTokenizer),
    )
}

#[tokio::test]
async fn test_chat_invoke_through_vault_reference() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path(model_path("chat-bison@002", "predict")))
        .and(header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .and(body_partial_json(json!({
            "instances": [{
                "context": "Answer in one word.",
                "messages": [{"author": "user", "content": "Capital of France?"}]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{
                "candidates": [{"author": "1", "content": "Paris"}],
                "safetyAttributes": [{"blocked": false}]
            }],
            "metadata": {"tokenMetadata": {
                "inputTokenCount": {"totalTokens": 9},
                "outputTokenCount": {"totalTokens": 1}
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _dir) = vault(&server, "42").await;
    let integration = integration(store);
    let settings = settings(&server, "chat-bison@002").validate().unwrap();

    let input = InvocationInput::Prompt(
        PromptStructure::from_prompt("Capital of France?").with_context("Answer in one word."),
    );
    let envelope = integration.invoke(&settings, Some("42"), input).await.unwrap();

    assert_eq!(envelope.object, EnvelopeObject::ChatCompletion);
    assert_eq!(envelope.model, "chat-bison@002");
    assert_eq!(envelope.content(), "Paris");
    assert_eq!(envelope.finish_reason.as_deref(), Some("stop"));
    let usage = envelope.usage.unwrap();
    assert_eq!((usage.prompt_tokens, usage.completion_tokens), (9, 1));
}

#[tokio::test]
async fn test_missing_scope_is_a_credential_failure() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let (store, _dir) = vault(&server, "42").await;
    let integration = integration(store);

    let result = integration
        .dispatch(DispatchRequest::CheckSettings {
            settings: settings(&server, "chat-bison@002"),
            scope: Some("7".to_string()),
        })
        .await;
    match result {
        DispatchResult::Failure { ok, error } => {
            assert!(!ok);
            assert_eq!(error.kind, "credential");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_check_settings_and_model_discovery() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(models_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "projects/acme/locations/us-central1/models/chat-bison-32k", "displayName": "Chat 32k"},
                {"name": "projects/acme/locations/us-central1/models/my-tuned"}
            ]
        })))
        .mount(&server)
        .await;

    let (store, _dir) = vault(&server, DEFAULT_SCOPE).await;
    let integration = integration(store);

    let checked = integration
        .dispatch(DispatchRequest::CheckSettings {
            settings: settings(&server, "chat-bison@002"),
            scope: None,
        })
        .await;
    assert_eq!(checked, DispatchResult::success(json!(true)));

    let listed = integration
        .dispatch(DispatchRequest::GetModels {
            settings: settings(&server, "chat-bison@002"),
            scope: None,
        })
        .await;
    let value = serde_json::to_value(&listed).unwrap();
    assert_eq!(value["ok"], true);
    let models = value["response"].as_array().unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0]["id"], "chat-bison-32k");
    assert_eq!(models[0]["name"], "Chat 32k");
    assert_eq!(models[0]["token_limit"]["input"], 32000);
    assert_eq!(models[1]["token_limit"]["input"], 8192);

    assert!(integration.registry().snapshot().get("my-tuned").is_some());
}

#[tokio::test]
async fn test_completion_invoke_with_overrides() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path(model_path("text-bison@002", "predict")))
        .and(body_partial_json(json!({
            "instances": [{"prompt": "\ninput: Say hi\noutput: "}],
            "parameters": {"maxOutputTokens": 16}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{"content": "hi there", "safetyAttributes": {"blocked": false}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _dir) = vault(&server, DEFAULT_SCOPE).await;
    let integration = integration(store);

    let mut legacy = settings(&server, "chat-bison@002");
    legacy.dispatch = DispatchMode::LegacyPrefix;

    let result = integration
        .dispatch(DispatchRequest::Invoke {
            settings: legacy,
            scope: None,
            input: InvocationInput::Text("Say hi".to_string()),
            overrides: SettingsOverrides {
                model_name: Some("text-bison@002".to_string()),
                max_output_tokens: Some(16),
                ..SettingsOverrides::default()
            },
        })
        .await;

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["ok"], true, "{}", value);
    assert_eq!(value["response"]["object"], "text_completion");
    assert_eq!(value["response"]["payload"]["text"], "hi there");
    // "Say hi" costs 3 tokens; "hi there" costs 3.
    assert_eq!(value["response"]["usage"]["prompt_tokens"], 3);
    assert_eq!(value["response"]["usage"]["completion_tokens"], 3);
}

#[tokio::test]
async fn test_provider_error_reaches_the_host() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path(model_path("text-bison@002", "predict")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Permission denied on resource", "status": "PERMISSION_DENIED"}
        })))
        .mount(&server)
        .await;

    let (store, _dir) = vault(&server, DEFAULT_SCOPE).await;
    let integration = integration(store);
    let settings = settings(&server, "text-bison@002").validate().unwrap();

    let err = integration
        .invoke(&settings, None, InvocationInput::Text("hello".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, IntegrationError::Provider(_)));
    assert_eq!(err.kind(), "credential");
    assert!(err.to_string().contains("Permission denied on resource"));
}

#[tokio::test]
async fn test_streamed_chat() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    let sse = concat!(
        "data: {\"predictions\":[{\"candidates\":[{\"content\":\"Bon\"}]}]}\n\n",
        "data: {\"predictions\":[{\"candidates\":[{\"content\":\"jour\"}]}]}\n\n",
    );
    Mock::given(method("POST"))
        .and(path(model_path("chat-bison@002", "serverStreamingPredict")))
        .and(query_param("alt", "sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse),
        )
        .mount(&server)
        .await;

    let (store, _dir) = vault(&server, DEFAULT_SCOPE).await;
    let integration = integration(store);
    let settings = settings(&server, "chat-bison@002").validate().unwrap();

    let chunks: Vec<_> = integration
        .stream(&settings, None, InvocationInput::Text("Greet me".to_string()))
        .await
        .unwrap()
        .collect()
        .await;

    let chunks: Vec<_> = chunks.into_iter().map(|c| c.unwrap()).collect();
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| c.object == EnvelopeObject::ChatCompletionChunk));
    assert!(chunks.iter().all(|c| c.id == chunks[0].id));
    let text: String = chunks.iter().map(|c| c.content()).collect();
    assert_eq!(text, "Bonjour");
}

#[tokio::test]
async fn test_embed_query() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path(model_path("textembedding-gecko@003", "predict")))
        .and(body_partial_json(json!({"instances": [{"content": "where is my order"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{"embeddings": {"values": [0.5, -0.25, 1.0]}}]
        })))
        .mount(&server)
        .await;

    let (store, _dir) = vault(&server, DEFAULT_SCOPE).await;
    let integration = integration(store);

    let result = integration
        .dispatch(DispatchRequest::EmbedQuery {
            settings: settings(&server, "textembedding-gecko@003"),
            scope: None,
            text: "where is my order".to_string(),
        })
        .await;
    assert_eq!(result, DispatchResult::success(json!([0.5, -0.25, 1.0])));
}

#[tokio::test]
async fn test_seeded_limits_feed_the_registry() {
    let server = MockServer::start().await;
    let (store, _dir) = vault(&server, DEFAULT_SCOPE).await;

    assert!(seed_token_limits(store.as_ref()).await.unwrap());
    assert!(!seed_token_limits(store.as_ref()).await.unwrap());

    let integration = VertexIntegration::from_store(store).await.unwrap();
    let descriptor = integration.registry().resolve("code-gecko@002");
    assert_eq!(descriptor.token_limit.input, 2048);
    assert_eq!(descriptor.token_limit.output, 64);
}
