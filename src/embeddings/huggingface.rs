//! HuggingFace Inference API embedding provider.
//!
//! Uses HuggingFace's hosted inference API for embedding generation.
//! Requires a HuggingFace API token (`HF_TOKEN`).

use serde::{Deserialize, Serialize};

use super::http::{build_client, check_status, decode, malformed, send_error};
use super::provider::EmbeddingProvider;
use super::types::{huggingface_models, ProviderInfo};
use crate::error::ProviderResult;

const NAME: &str = "huggingface";

/// HuggingFace Inference API embedding provider.
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    token: String,
    dimensions: usize,
    max_chars: usize,
}

impl HuggingFaceProvider {
    /// Create a new HuggingFace provider.
    ///
    /// Returns `None` if the token is empty.
    pub fn new(endpoint: String, model: String, token: String) -> Option<Self> {
        if token.trim().is_empty() {
            return None;
        }
        let config = huggingface_models::get_config(&model);

        Some(Self {
            client: build_client(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            token,
            dimensions: config.dimensions,
            max_chars: config.max_chars,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}/pipeline/feature-extraction",
            self.endpoint, self.model
        )
    }

    async fn request(&self, inputs: HfInputs<'_>) -> ProviderResult<HfEmbedResponse> {
        let request = HfEmbedRequest {
            inputs,
            options: HfOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(NAME, &e))?;

        let response = check_status(NAME, response).await?;
        decode(NAME, response).await
    }
}

/// HuggingFace API request for feature extraction.
#[derive(Debug, Serialize)]
struct HfEmbedRequest<'a> {
    inputs: HfInputs<'a>,
    options: HfOptions,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum HfInputs<'a> {
    Single(&'a str),
    Batch(Vec<&'a str>),
}

#[derive(Debug, Serialize)]
struct HfOptions {
    wait_for_model: bool,
}

/// HuggingFace API response - can be single or batch embeddings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfEmbedResponse {
    /// Direct embedding (most sentence-transformers models)
    Direct(Vec<f32>),
    /// Single embedding nested once, or a batch of direct embeddings
    Nested(Vec<Vec<f32>>),
    /// Batch of nested embeddings
    Batch(Vec<Vec<Vec<f32>>>),
}

impl EmbeddingProvider for HuggingFaceProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: NAME.to_string(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            max_chars: self.max_chars,
        }
    }

    async fn is_available(&self) -> bool {
        // Pinging the API would spend rate-limit quota.
        !self.token.is_empty()
    }

    async fn generate_embedding(&self, text: &str) -> ProviderResult<Vec<f32>> {
        match self.request(HfInputs::Single(text)).await? {
            HfEmbedResponse::Direct(embedding) => Ok(embedding),
            HfEmbedResponse::Nested(nested) => nested
                .into_iter()
                .next()
                .ok_or_else(|| malformed(NAME, "no embeddings in response")),
            HfEmbedResponse::Batch(batch) => batch
                .into_iter()
                .next()
                .and_then(|nested| nested.into_iter().next())
                .ok_or_else(|| malformed(NAME, "no embeddings in batch response")),
        }
    }

    async fn generate_embeddings(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        let embeddings = match self.request(HfInputs::Batch(texts.to_vec())).await? {
            HfEmbedResponse::Nested(rows) => rows,
            HfEmbedResponse::Batch(batch) => batch
                .into_iter()
                .filter_map(|nested| nested.into_iter().next())
                .collect(),
            HfEmbedResponse::Direct(embedding) => vec![embedding],
        };

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
    fn test_huggingface_provider_requires_token() {
        let provider = HuggingFaceProvider::new(
            "https://hf.test".into(),
            "sentence-transformers/all-MiniLM-L6-v2".into(),
            "  ".into(),
        );
        assert!(provider.is_none());
    }

    #[test]
    fn test_huggingface_provider_with_token() {
        let provider = HuggingFaceProvider::new(
            "https://hf.test/".into(),
            "sentence-transformers/all-mpnet-base-v2".into(),
            "test-token".into(),
        )
        .unwrap();
        let info = provider.info();
        assert_eq!(info.name, "huggingface");
        assert_eq!(info.dimensions, 768);
        assert_eq!(
            provider.url(),
            "https://hf.test/models/sentence-transformers/all-mpnet-base-v2/pipeline/feature-extraction"
        );
    }

    #[test]
    fn test_response_shapes() {
        let direct: HfEmbedResponse = serde_json::from_str("[0.1, 0.2]").unwrap();
        assert!(matches!(direct, HfEmbedResponse::Direct(v) if v.len() == 2));

        let nested: HfEmbedResponse = serde_json::from_str("[[0.1, 0.2]]").unwrap();
        assert!(matches!(nested, HfEmbedResponse::Nested(v) if v.len() == 1));

        let batch: HfEmbedResponse = serde_json::from_str("[[[0.1]], [[0.2]]]").unwrap();
        assert!(matches!(batch, HfEmbedResponse::Batch(v) if v.len() == 2));
    }
}
