//! Gemini embedding provider.
//!
//! Calls the Generative Language API `embedContent` and
//! `batchEmbedContents` methods. Requires `GEMINI_API_KEY`.

use serde::{Deserialize, Serialize};

use super::http::{build_client, check_status, decode, malformed, send_error};
use super::provider::EmbeddingProvider;
use super::types::{gemini_models, ProviderInfo};
use crate::error::ProviderResult;

const NAME: &str = "gemini";

/// Gemini embedding provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    dimensions: usize,
    max_chars: usize,
}

impl GeminiProvider {
    /// Create a provider. The key is checked for presence by the factory.
    pub fn new(endpoint: String, model: String, api_key: String) -> Self {
        let config = gemini_models::get_config(&model);
        Self {
            client: build_client(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: config.name,
            api_key,
            dimensions: config.dimensions,
            max_chars: config.max_chars,
        }
    }

    fn model_resource(&self) -> String {
        format!("models/{}", self.model)
    }
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

impl EmbeddingProvider for GeminiProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: NAME.to_string(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            max_chars: self.max_chars,
        }
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate_embedding(&self, text: &str) -> ProviderResult<Vec<f32>> {
        let url = format!("{}/{}:embedContent", self.endpoint, self.model_resource());
        let request = EmbedContentRequest {
            model: self.model_resource(),
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(NAME, &e))?;

        let response = check_status(NAME, response).await?;
        let data: EmbedContentResponse = decode(NAME, response).await?;

        data.embedding
            .map(|e| e.values)
            .ok_or_else(|| malformed(NAME, "response has no embedding"))
    }

    async fn generate_embeddings(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        let url = format!("{}/{}:batchEmbedContents", self.endpoint, self.model_resource());
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|&text| EmbedContentRequest {
                    model: self.model_resource(),
                    content: Content {
                        parts: vec![Part { text }],
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(NAME, &e))?;

        let response = check_status(NAME, response).await?;
        let data: BatchEmbedResponse = decode(NAME, response).await?;

        if data.embeddings.len() != texts.len() {
            return Err(malformed(
                NAME,
                &format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    data.embeddings.len()
                ),
            ));
        }
        Ok(data.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_provider_info() {
        let provider = GeminiProvider::new(
            "https://example.test/v1beta/".into(),
            "text-embedding-004".into(),
            "key".into(),
        );
        let info = provider.info();
        assert_eq!(info.name, "gemini");
        assert_eq!(info.dimensions, 768);
        assert_eq!(provider.endpoint, "https://example.test/v1beta");
        assert_eq!(provider.model_resource(), "models/text-embedding-004");
    }

    #[test]
    fn test_request_shape() {
        let request = EmbedContentRequest {
            model: "models/text-embedding-004".into(),
            content: Content {
                parts: vec![Part { text: "hello" }],
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["content"]["parts"][0]["text"], "hello");
        assert_eq!(json["model"], "models/text-embedding-004");
    }

    #[test]
    fn test_response_parsing() {
        let data: EmbedContentResponse =
            serde_json::from_str(r#"{"embedding":{"values":[0.1,0.2]}}"#).unwrap();
        assert_eq!(data.embedding.unwrap().values, vec![0.1, 0.2]);

        let batch: BatchEmbedResponse =
            serde_json::from_str(r#"{"embeddings":[{"values":[1.0]},{"values":[2.0]}]}"#).unwrap();
        assert_eq!(batch.embeddings.len(), 2);
    }
}
