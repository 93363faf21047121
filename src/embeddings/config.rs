//! Embedding configuration management.
//!
//! Loads and saves settings from `~/.craft/config.json` and resolves the
//! effective provider configuration.
//!
//! Priority for every value: environment variable > config file > default.
//! Resolution takes the environment as a lookup function so it can be
//! exercised without touching the process environment.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::client::{InputPolicy, RetryPolicy};
use super::types::{
    gemini_models, huggingface_models, ollama_models, CraftConfig, EmbeddingProviderType,
    EmbeddingSettings, RetrySettings,
};

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_HF_ENDPOINT: &str = "https://router.huggingface.co/hf-inference";

/// Default number of in-flight embedding calls.
pub const DEFAULT_CONCURRENCY: usize = 4;
/// Upper bound on in-flight embedding calls, whatever the configuration says.
pub const MAX_CONCURRENCY: usize = 8;

/// Get the config file path.
pub fn config_path() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|b| b.home_dir().join(".craft").join("config.json"))
        .ok_or(Error::Config("Could not determine home directory".into()))
}

/// Load the full Craft configuration.
pub fn load_config() -> Result<CraftConfig> {
    load_config_from(&config_path()?)
}

/// Load configuration from an explicit file. A missing file is the default config.
pub fn load_config_from(path: &Path) -> Result<CraftConfig> {
    if !path.exists() {
        return Ok(CraftConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Save the full Craft configuration.
pub fn save_config(config: &CraftConfig) -> Result<()> {
    save_config_to(&config_path()?, config)
}

/// Save configuration to an explicit file.
pub fn save_config_to(path: &Path, config: &CraftConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

    Ok(())
}

/// Get embedding settings from config file.
pub fn get_embedding_settings() -> Result<Option<EmbeddingSettings>> {
    Ok(load_config()?.embeddings)
}

/// Merge `update` over `existing`, field by field.
#[must_use]
pub fn merge_embedding_settings(
    existing: EmbeddingSettings,
    update: &EmbeddingSettings,
) -> EmbeddingSettings {
    EmbeddingSettings {
        provider: update.provider.or(existing.provider),
        gemini_api_key: update.gemini_api_key.clone().or(existing.gemini_api_key),
        gemini_model: update.gemini_model.clone().or(existing.gemini_model),
        gemini_endpoint: update.gemini_endpoint.clone().or(existing.gemini_endpoint),
        ollama_endpoint: update.ollama_endpoint.clone().or(existing.ollama_endpoint),
        ollama_model: update.ollama_model.clone().or(existing.ollama_model),
        hf_token: update.hf_token.clone().or(existing.hf_token),
        hf_model: update.hf_model.clone().or(existing.hf_model),
        hf_endpoint: update.hf_endpoint.clone().or(existing.hf_endpoint),
        chunk_average: update.chunk_average.or(existing.chunk_average),
    }
}

/// Save embedding settings (merges with existing config).
pub fn save_embedding_settings(settings: &EmbeddingSettings) -> Result<()> {
    let mut config = load_config()?;
    let existing = config.embeddings.take().unwrap_or_default();
    config.embeddings = Some(merge_embedding_settings(existing, settings));
    save_config(&config)
}

/// Reset embedding settings (removes from config).
pub fn reset_embedding_settings() -> Result<()> {
    let mut config = load_config()?;
    config.embeddings = None;
    save_config(&config)
}

/// Read a variable from the process environment, ignoring empty values.
#[must_use]
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Effective embedding configuration after merging env, file and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEmbeddingConfig {
    pub provider: EmbeddingProviderType,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_endpoint: String,
    pub ollama_endpoint: String,
    pub ollama_model: String,
    pub hf_token: Option<String>,
    pub hf_model: String,
    pub hf_endpoint: String,
    pub input_policy: InputPolicy,
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
}

fn pick(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    file: Option<&String>,
    default: impl FnOnce() -> String,
) -> String {
    env(key).or_else(|| file.cloned()).unwrap_or_else(default)
}

/// Resolve the embedding configuration.
///
/// # Errors
///
/// Returns `Error::Config` for an unknown `CRAFT_EMBEDDING_PROVIDER` or a
/// non-numeric `CRAFT_INDEX_CONCURRENCY`.
pub fn resolve_embedding_config(
    config: &CraftConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedEmbeddingConfig> {
    let file = config.embeddings.clone().unwrap_or_default();

    let provider = match env("CRAFT_EMBEDDING_PROVIDER") {
        Some(raw) => raw.parse::<EmbeddingProviderType>().map_err(Error::Config)?,
        None => file.provider.unwrap_or_default(),
    };

    let file_concurrency = config.indexing.as_ref().and_then(|i| i.max_concurrency);
    let max_concurrency = match env("CRAFT_INDEX_CONCURRENCY") {
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            Error::Config(format!("CRAFT_INDEX_CONCURRENCY must be a number, got '{raw}'"))
        })?,
        None => file_concurrency.unwrap_or(DEFAULT_CONCURRENCY),
    }
    .clamp(1, MAX_CONCURRENCY);

    let input_policy = if file.chunk_average.unwrap_or(false) {
        InputPolicy::ChunkAverage
    } else {
        InputPolicy::Truncate
    };

    Ok(ResolvedEmbeddingConfig {
        provider,
        gemini_api_key: env("GEMINI_API_KEY").or_else(|| file.gemini_api_key.clone()),
        gemini_model: pick(&env, "GEMINI_MODEL", file.gemini_model.as_ref(), || {
            gemini_models::default_config().name
        }),
        gemini_endpoint: pick(&env, "GEMINI_ENDPOINT", file.gemini_endpoint.as_ref(), || {
            DEFAULT_GEMINI_ENDPOINT.to_string()
        }),
        ollama_endpoint: pick(&env, "OLLAMA_ENDPOINT", file.ollama_endpoint.as_ref(), || {
            DEFAULT_OLLAMA_ENDPOINT.to_string()
        }),
        ollama_model: pick(&env, "OLLAMA_MODEL", file.ollama_model.as_ref(), || {
            ollama_models::default_config().name
        }),
        hf_token: env("HF_TOKEN").or_else(|| file.hf_token.clone()),
        hf_model: pick(&env, "HF_MODEL", file.hf_model.as_ref(), || {
            huggingface_models::default_config().name
        }),
        hf_endpoint: pick(&env, "HF_ENDPOINT", file.hf_endpoint.as_ref(), || {
            DEFAULT_HF_ENDPOINT.to_string()
        }),
        input_policy,
        max_concurrency,
        retry: resolve_retry_policy(config.retry.as_ref()),
    })
}

/// Build a retry policy from file settings, falling back to defaults.
#[must_use]
pub fn resolve_retry_policy(settings: Option<&RetrySettings>) -> RetryPolicy {
    let defaults = RetryPolicy::default();
    let Some(settings) = settings else {
        return defaults;
    };

    RetryPolicy {
        max_attempts: settings.max_attempts.unwrap_or(defaults.max_attempts).max(1),
        base_delay: settings
            .base_delay_ms
            .map_or(defaults.base_delay, Duration::from_millis),
        max_delay: settings
            .max_delay_ms
            .map_or(defaults.max_delay, Duration::from_millis),
    }
}

/// Resolve against `~/.craft/config.json` and the process environment.
pub fn resolve_from_environment() -> Result<ResolvedEmbeddingConfig> {
    resolve_embedding_config(&load_config()?, process_env)
}
