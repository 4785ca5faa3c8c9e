//! The integration service.
//!
//! [`VertexIntegration`] owns its collaborators explicitly and runs every
//! request through the same pipeline: reveal credentials, resolve the model,
//! fit the conversation to the input budget, assemble the request, call the
//! provider, normalize the response.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vertexai_core::{
    ConversationBudgeter, IntegrationSettings, ModelDescriptor, TokenLimit, Tokenizer,
    ValidatedSettings, ValidationError,
};
use vertexai_providers::{
    descriptors_from_discovery, normalize_prediction, normalize_stream, CallParameters,
    ClientFactory, ClientTarget, EnvelopeStream, ModelRegistry, ProviderClient, ProviderError,
    ProviderRequest, RegistrySnapshot, RequestAssembler, ResponseEnvelope, TokenLimitTable,
    VertexClientFactory,
};
use vertexai_secrets::{SecretResolver, SecretStore, VaultResolver};

use crate::error::Result;
use crate::input::{CountInput, InvocationInput};
use crate::metadata::IntegrationMetadata;

/// Which indexer component a model should back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexerTarget {
    Embedding,
    Completion,
    Chat,
}

/// Indexer wiring for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub target: IndexerTarget,
    pub model: String,
    pub project: String,
    pub location: String,
}

/// A request ready to send, with its prompt-side token estimate.
struct Prepared {
    request: ProviderRequest,
    prompt_tokens: usize,
}

/// Vertex AI integration service.
pub struct VertexIntegration {
    resolver: Arc<dyn SecretResolver>,
    factory: Arc<dyn ClientFactory>,
    registry: Arc<ModelRegistry>,
    tokenizer: Arc<dyn Tokenizer>,
}

impl VertexIntegration {
    pub fn new(
        resolver: Arc<dyn SecretResolver>,
        factory: Arc<dyn ClientFactory>,
        registry: Arc<ModelRegistry>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        Self {
            resolver,
            factory,
            registry,
            tokenizer,
        }
    }

    /// Wire up the production collaborators around a secret store.
    ///
    /// The registry starts empty and uses the vault's token-limit table.
    pub async fn from_store(store: Arc<dyn SecretStore>) -> Result<Self> {
        let limits = TokenLimitTable::load(store.as_ref()).await?;
        let registry = ModelRegistry::new(RegistrySnapshot::new(Vec::new(), limits));
        Ok(Self::new(
            Arc::new(VaultResolver::new(store)),
            Arc::new(VertexClientFactory::new()?),
            Arc::new(registry),
            vertexai_core::default_tokenizer(),
        ))
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    pub fn metadata(&self) -> IntegrationMetadata {
        IntegrationMetadata::current()
    }

    async fn connect(
        &self,
        settings: &ValidatedSettings,
        scope: Option<&str>,
    ) -> Result<Arc<dyn ProviderClient>> {
        let field = settings
            .service_account_info
            .as_ref()
            .ok_or_else(|| ValidationError::MissingField("service_account_info".to_string()))?;
        let credentials = self
            .resolver
            .reveal(field, scope)
            .await
            .map_err(ProviderError::from)?;

        let target = ClientTarget {
            project: settings.project.clone(),
            location: settings.location.clone(),
            api_endpoint: settings.api_endpoint.clone(),
        };
        Ok(self.factory.init_client(&target, credentials).await?)
    }

    /// Descriptor for the configured model, with the settings' input limit applied.
    fn resolve_model(&self, settings: &ValidatedSettings, model_id: &str) -> ModelDescriptor {
        let mut descriptor = settings
            .model(model_id)
            .cloned()
            .unwrap_or_else(|| self.registry.resolve(model_id));
        if let Some(input) = settings.input_token_limit {
            descriptor.token_limit = TokenLimit::new(input, descriptor.token_limit.output);
        }
        descriptor
    }

    /// Validate, authenticate, and probe the provider with a model listing.
    pub async fn check_settings(
        &self,
        settings: IntegrationSettings,
        scope: Option<&str>,
    ) -> Result<ValidatedSettings> {
        let settings = settings.validate()?;
        let client = self.connect(&settings, scope).await?;
        let models = client.list_models().await?;
        info!(
            project = %settings.project,
            location = %settings.location,
            models = models.len(),
            "settings check passed"
        );
        Ok(settings)
    }

    /// Discover models, refresh the registry, and return the descriptors.
    pub async fn get_models(
        &self,
        settings: &ValidatedSettings,
        scope: Option<&str>,
    ) -> Result<Vec<ModelDescriptor>> {
        let client = self.connect(settings, scope).await?;
        let raw = client.list_models().await?;

        let snapshot = self.registry.snapshot();
        let limits = snapshot.limits().clone();
        let descriptors = descriptors_from_discovery(&raw, &limits, &settings.models);
        self.registry.refresh(descriptors.clone(), limits);
        Ok(descriptors)
    }

    pub fn count_tokens(&self, data: &CountInput) -> usize {
        data.count(self.tokenizer.as_ref())
    }

    fn prepare(
        &self,
        settings: &ValidatedSettings,
        input: InvocationInput,
        stream: bool,
    ) -> Result<Prepared> {
        let structure = input.into_prompt()?;
        let descriptor = self.resolve_model(settings, &settings.model_name);
        let limit = descriptor.token_limit.input;

        let budgeter = ConversationBudgeter::new(self.tokenizer.clone());
        let (trimmed, remaining) = budgeter.fit(&structure, limit);
        if remaining < 0 {
            warn!(
                model = %descriptor.id,
                limit,
                remaining,
                "input exceeds the model's token limit, sending what fits"
            );
        }
        let prompt_tokens = trimmed.token_cost(self.tokenizer.as_ref());

        let params = CallParameters::from_settings(settings, stream);
        let request = RequestAssembler::new(settings.dispatch).assemble(trimmed, &params, &descriptor)?;
        Ok(Prepared {
            request,
            prompt_tokens,
        })
    }

    /// Run one complete generation.
    pub async fn invoke(
        &self,
        settings: &ValidatedSettings,
        scope: Option<&str>,
        input: InvocationInput,
    ) -> Result<ResponseEnvelope> {
        let prepared = self.prepare(settings, input, false)?;
        let client = self.connect(settings, scope).await?;

        let prediction = client.predict(&prepared.request).await?;
        debug!(model = prepared.request.model(), "prediction received");
        Ok(normalize_prediction(
            prepared.request.model(),
            prediction,
            prepared.request.is_chat(),
            prepared.prompt_tokens,
            self.tokenizer.as_ref(),
        ))
    }

    /// Run one streamed generation. Chunks are produced as the caller polls.
    pub async fn stream(
        &self,
        settings: &ValidatedSettings,
        scope: Option<&str>,
        input: InvocationInput,
    ) -> Result<EnvelopeStream> {
        let prepared = self.prepare(settings, input, true)?;
        let client = self.connect(settings, scope).await?;

        let upstream = client.predict_stream(&prepared.request).await?;
        Ok(normalize_stream(
            prepared.request.model(),
            prepared.request.is_chat(),
            upstream,
        ))
    }

    /// Embed documents with the configured model, one vector per text.
    pub async fn embed(
        &self,
        settings: &ValidatedSettings,
        scope: Option<&str>,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>> {
        let descriptor = self.resolve_model(settings, &settings.model_name);
        let request = RequestAssembler::new(settings.dispatch).assemble_embedding(&descriptor, texts)?;
        let client = self.connect(settings, scope).await?;
        Ok(client.embed(&request).await?)
    }

    /// Embed a single query string.
    pub async fn embed_query(
        &self,
        settings: &ValidatedSettings,
        scope: Option<&str>,
        text: String,
    ) -> Result<Vec<f32>> {
        let mut vectors = self.embed(settings, scope, vec![text]).await?;
        vectors
            .pop()
            .ok_or_else(|| ProviderError::server_error(200, "no embedding returned").into())
    }

    /// Indexer wiring for `model`, which must be a known descriptor.
    pub fn indexer_config(&self, settings: &ValidatedSettings, model: &str) -> Result<IndexerConfig> {
        let descriptor = settings
            .model(model)
            .cloned()
            .or_else(|| self.registry.snapshot().get(model).cloned())
            .ok_or_else(|| ValidationError::Invalid(format!("No model info found: {}", model)))?;

        let target = if descriptor.capabilities.embeddings {
            IndexerTarget::Embedding
        } else if !descriptor.capabilities.chat_completion {
            IndexerTarget::Completion
        } else {
            IndexerTarget::Chat
        };

        Ok(IndexerConfig {
            target,
            model: descriptor.id,
            project: settings.project.clone(),
            location: settings.location.clone(),
        })
    }
}
