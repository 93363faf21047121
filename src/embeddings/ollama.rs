//! Ollama embedding provider.
//!
//! Uses a local Ollama server for embedding generation. No credential is
//! needed, which makes it the offline choice.

use serde::{Deserialize, Serialize};

use super::http::{build_client, check_status, decode, malformed, send_error};
use super::provider::EmbeddingProvider;
use super::types::{ollama_models, ProviderInfo};
use crate::error::ProviderResult;

const NAME: &str = "ollama";

/// Ollama embedding provider.
pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    max_chars: usize,
}

impl OllamaProvider {
    /// Create a new Ollama provider.
    pub fn new(endpoint: String, model: String) -> Self {
        let config = ollama_models::get_config(&model);

        Self {
            client: build_client(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            dimensions: config.dimensions,
            max_chars: config.max_chars,
        }
    }
}

/// Ollama API response for listing models.
#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Option<Vec<OllamaModel>>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

/// Ollama API request for embedding.
#[derive(Debug, Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: EmbedInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EmbedInput<'a> {
    Single(&'a str),
    Batch(Vec<&'a str>),
}

/// Ollama API response for embedding.
#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaProvider {
    async fn embed(&self, input: EmbedInput<'_>) -> ProviderResult<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.endpoint);

        let request = OllamaEmbedRequest {
            model: &self.model,
            input,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(NAME, &e))?;

        let response = check_status(NAME, response).await?;
        let data: OllamaEmbedResponse = decode(NAME, response).await?;
        Ok(data.embeddings)
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: NAME.to_string(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            max_chars: self.max_chars,
        }
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);

        let Ok(response) = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
        else {
            return false;
        };

        if !response.status().is_success() {
            return false;
        }

        let Ok(data) = response.json::<OllamaTagsResponse>().await else {
            return false;
        };

        data.models.is_some_and(|models| {
            models
                .iter()
                .any(|m| m.name == self.model || m.name.starts_with(&format!("{}:", self.model)))
        })
    }

    async fn generate_embedding(&self, text: &str) -> ProviderResult<Vec<f32>> {
        self.embed(EmbedInput::Single(text))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| malformed(NAME, "no embeddings returned"))
    }

    async fn generate_embeddings(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        let embeddings = self.embed(EmbedInput::Batch(texts.to_vec())).await?;
        if embeddings.len() != texts.len() {
            return Err(malformed(
                NAME,
                &format!("expected {} embeddings, got {}", texts.len(), embeddings.len()),
            ));
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new(
            "http://localhost:11434/".to_string(),
            "nomic-embed-text".to_string(),
        );
        let info = provider.info();
        assert_eq!(info.name, "ollama");
        assert_eq!(info.dimensions, 768);
        assert_eq!(provider.endpoint, "http://localhost:11434");
    }

    #[test]
    fn test_ollama_provider_custom_model() {
        let provider = OllamaProvider::new(
            "http://custom:11434".to_string(),
            "mxbai-embed-large".to_string(),
        );
        let info = provider.info();
        assert_eq!(info.model, "mxbai-embed-large");
        assert_eq!(info.dimensions, 1024);
    }

    #[test]
    fn test_untagged_input_serialization() {
        let single = serde_json::to_value(EmbedInput::Single("a")).unwrap();
        assert_eq!(single, serde_json::json!("a"));
        let batch = serde_json::to_value(EmbedInput::Batch(vec!["a", "b"])).unwrap();
        assert_eq!(batch, serde_json::json!(["a", "b"]));
    }
}
