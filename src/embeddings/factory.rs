//! Embedding provider factory.
//!
//! Turns a [`ResolvedEmbeddingConfig`] into a ready [`EmbeddingClient`].
//! Missing credentials are reported here, at startup, never at call time.

use tracing::debug;

use super::client::EmbeddingClient;
use super::config::ResolvedEmbeddingConfig;
use super::gemini::GeminiProvider;
use super::huggingface::HuggingFaceProvider;
use super::ollama::OllamaProvider;
use super::provider::{BoxedProvider, EmbeddingProvider};
use super::types::EmbeddingProviderType;
use crate::error::{Error, Result};

/// Available provider detection result.
#[derive(Debug, Clone)]
pub struct ProviderDetection {
    /// List of available provider names.
    pub available: Vec<String>,
    /// Recommended provider (first available).
    pub recommended: Option<String>,
}

/// Create the configured provider.
///
/// # Errors
///
/// Returns `Error::Config` when the selected provider needs a credential
/// that is not configured.
pub fn create_provider(config: &ResolvedEmbeddingConfig) -> Result<BoxedProvider> {
    match config.provider {
        EmbeddingProviderType::Gemini => {
            let key = config
                .gemini_api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| Error::Config("GEMINI_API_KEY is not set".into()))?;
            Ok(BoxedProvider::new(GeminiProvider::new(
                config.gemini_endpoint.clone(),
                config.gemini_model.clone(),
                key,
            )))
        }
        EmbeddingProviderType::Ollama => Ok(BoxedProvider::new(OllamaProvider::new(
            config.ollama_endpoint.clone(),
            config.ollama_model.clone(),
        ))),
        EmbeddingProviderType::Huggingface => HuggingFaceProvider::new(
            config.hf_endpoint.clone(),
            config.hf_model.clone(),
            config.hf_token.clone().unwrap_or_default(),
        )
        .map(BoxedProvider::new)
        .ok_or_else(|| Error::Config("HF_TOKEN is not set".into())),
    }
}

/// Wrap a provider with the configured retry, input and concurrency policies.
#[must_use]
pub fn build_client(provider: BoxedProvider, config: &ResolvedEmbeddingConfig) -> EmbeddingClient {
    EmbeddingClient::new(provider)
        .with_retry(config.retry)
        .with_input_policy(config.input_policy)
        .with_concurrency(config.max_concurrency)
}

/// Create a client from an already resolved configuration.
pub fn create_embedding_client(config: &ResolvedEmbeddingConfig) -> Result<EmbeddingClient> {
    let provider = create_provider(config)?;
    let info = provider.info();
    debug!(
        provider = %info.name,
        model = %info.model,
        concurrency = config.max_concurrency,
        "Embedding client ready"
    );
    Ok(build_client(provider, config))
}

/// Detect which embedding providers are usable with this configuration.
pub async fn detect_available_providers(config: &ResolvedEmbeddingConfig) -> ProviderDetection {
    let mut available = Vec::new();

    if let Some(key) = config.gemini_api_key.clone() {
        let gemini = GeminiProvider::new(
            config.gemini_endpoint.clone(),
            config.gemini_model.clone(),
            key,
        );
        if gemini.is_available().await {
            available.push(EmbeddingProviderType::Gemini.to_string());
        }
    }

    let ollama = OllamaProvider::new(config.ollama_endpoint.clone(), config.ollama_model.clone());
    if ollama.is_available().await {
        available.push(EmbeddingProviderType::Ollama.to_string());
    }

    if let Some(hf) = HuggingFaceProvider::new(
        config.hf_endpoint.clone(),
        config.hf_model.clone(),
        config.hf_token.clone().unwrap_or_default(),
    ) {
        if hf.is_available().await {
            available.push(EmbeddingProviderType::Huggingface.to_string());
        }
    }

    let recommended = available.first().cloned();

    ProviderDetection {
        available,
        recommended,
    }
}
