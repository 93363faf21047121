//! Embedding types and configuration.
//!
//! Settings live in `~/.craft/config.json`; see [`super::config`] for
//! how they are merged with environment variables.

use serde::{Deserialize, Serialize};

/// Embedding provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    /// Google Gemini `embedContent` API (hosted, needs `GEMINI_API_KEY`)
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
    /// HuggingFace Inference API (hosted, needs `HF_TOKEN`)
    Huggingface,
}

impl std::fmt::Display for EmbeddingProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Ollama => write!(f, "ollama"),
            Self::Huggingface => write!(f, "huggingface"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "huggingface" | "hf" => Ok(Self::Huggingface),
            _ => Err(format!("Unknown embedding provider: {s}")),
        }
    }
}

/// Embedding settings stored in `~/.craft/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: Option<EmbeddingProviderType>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_endpoint: Option<String>,
    pub ollama_endpoint: Option<String>,
    pub ollama_model: Option<String>,
    pub hf_token: Option<String>,
    pub hf_model: Option<String>,
    pub hf_endpoint: Option<String>,
    /// Embed oversized files chunk by chunk and average, instead of truncating.
    pub chunk_average: Option<bool>,
}

/// Indexing settings stored in `~/.craft/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingSettings {
    /// Extra glob patterns to exclude (matched against index-relative paths).
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Maximum concurrent embedding calls.
    pub max_concurrency: Option<usize>,
    /// Files larger than this become path nodes.
    pub max_file_bytes: Option<u64>,
}

/// Retry settings stored in `~/.craft/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

/// Craft local configuration file structure.
///
/// Stored at `~/.craft/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftConfig {
    pub embeddings: Option<EmbeddingSettings>,
    pub indexing: Option<IndexingSettings>,
    pub retry: Option<RetrySettings>,
}

/// Provider metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
    pub dimensions: usize,
    pub max_chars: usize,
}

/// Model configuration with dimensions and max chars.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub name: String,
    pub dimensions: usize,
    pub max_chars: usize,
}

/// Gemini model configurations.
pub mod gemini_models {
    use super::ModelConfig;

    pub fn text_embedding_004() -> ModelConfig {
        ModelConfig {
            name: "text-embedding-004".to_string(),
            dimensions: 768,
            max_chars: 8000,
        }
    }

    pub fn gemini_embedding_001() -> ModelConfig {
        ModelConfig {
            name: "gemini-embedding-001".to_string(),
            dimensions: 3072,
            max_chars: 8000,
        }
    }

    pub fn default_config() -> ModelConfig {
        text_embedding_004()
    }

    pub fn get_config(model: &str) -> ModelConfig {
        match model.trim_start_matches("models/") {
            "text-embedding-004" => text_embedding_004(),
            "gemini-embedding-001" => gemini_embedding_001(),
            other => ModelConfig {
                name: other.to_string(),
                dimensions: 768,
                max_chars: 8000,
            },
        }
    }
}

/// Ollama model configurations.
pub mod ollama_models {
    use super::ModelConfig;

    pub fn nomic_embed_text() -> ModelConfig {
        ModelConfig {
            name: "nomic-embed-text".to_string(),
            dimensions: 768,
            max_chars: 5000,
        }
    }

    pub fn mxbai_embed_large() -> ModelConfig {
        ModelConfig {
            name: "mxbai-embed-large".to_string(),
            dimensions: 1024,
            max_chars: 1500,
        }
    }

    pub fn all_minilm() -> ModelConfig {
        ModelConfig {
            name: "all-minilm".to_string(),
            dimensions: 384,
            max_chars: 800,
        }
    }

    pub fn default_config() -> ModelConfig {
        nomic_embed_text()
    }

    pub fn get_config(model: &str) -> ModelConfig {
        match model {
            "nomic-embed-text" => nomic_embed_text(),
            "mxbai-embed-large" => mxbai_embed_large(),
            "all-minilm" => all_minilm(),
            _ => ModelConfig {
                name: model.to_string(),
                dimensions: 768,
                max_chars: 5000,
            },
        }
    }
}

/// HuggingFace model configurations.
pub mod huggingface_models {
    use super::ModelConfig;

    pub fn all_minilm_l6_v2() -> ModelConfig {
        ModelConfig {
            name: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            max_chars: 800,
        }
    }

    pub fn all_mpnet_base_v2() -> ModelConfig {
        ModelConfig {
            name: "sentence-transformers/all-mpnet-base-v2".to_string(),
            dimensions: 768,
            max_chars: 1500,
        }
    }

    pub fn default_config() -> ModelConfig {
        all_minilm_l6_v2()
    }

    pub fn get_config(model: &str) -> ModelConfig {
        match model {
            "sentence-transformers/all-MiniLM-L6-v2" => all_minilm_l6_v2(),
            "sentence-transformers/all-mpnet-base-v2" => all_mpnet_base_v2(),
            _ => ModelConfig {
                name: model.to_string(),
                dimensions: 384,
                max_chars: 800,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_round_trips_through_str() {
        for kind in [
            EmbeddingProviderType::Gemini,
            EmbeddingProviderType::Ollama,
            EmbeddingProviderType::Huggingface,
        ] {
            assert_eq!(kind.to_string().parse::<EmbeddingProviderType>(), Ok(kind));
        }
        assert_eq!("HF".parse(), Ok(EmbeddingProviderType::Huggingface));
        assert!("openai".parse::<EmbeddingProviderType>().is_err());
    }

    #[test]
    fn test_gemini_model_accepts_resource_prefix() {
        let config = gemini_models::get_config("models/text-embedding-004");
        assert_eq!(config.name, "text-embedding-004");
        assert_eq!(config.dimensions, 768);
    }

    #[test]
    fn test_config_deserializes_partial_file() {
        let config: CraftConfig =
            serde_json::from_str(r#"{"embeddings":{"provider":"ollama"}}"#).unwrap();
        let embeddings = config.embeddings.unwrap();
        assert_eq!(embeddings.provider, Some(EmbeddingProviderType::Ollama));
        assert!(config.indexing.is_none());
    }
}
