//! Embeddings command implementation.
//!
//! Provides CLI commands for managing the embedding provider:
//! - `status` - Show the resolved configuration and provider availability
//! - `configure` - Save provider settings to `~/.craft/config.json`
//! - `test` - Embed a sample text through the configured client

use colored::Colorize;
use serde::Serialize;

use super::runtime;
use crate::cli::EmbeddingsCommands;
use crate::embeddings::{
    create_embedding_client, create_provider, detect_available_providers, get_embedding_settings,
    reset_embedding_settings, resolve_from_environment, save_embedding_settings,
    EmbeddingProviderType, EmbeddingSettings, InputPolicy, ResolvedEmbeddingConfig,
};
use crate::error::{Error, Result};

/// Output for embeddings status command.
#[derive(Serialize)]
struct StatusOutput {
    provider: String,
    model: String,
    endpoint: String,
    credential_set: bool,
    input_policy: &'static str,
    max_concurrency: usize,
    available_providers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active: Option<ActiveProviderInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ActiveProviderInfo {
    name: String,
    model: String,
    dimensions: usize,
    max_chars: usize,
}

/// Output for embeddings test command.
#[derive(Serialize)]
struct TestOutput {
    provider: String,
    model: String,
    dimensions: usize,
    input_text: String,
    embedding_sample: Vec<f32>,
}

/// Output for configure command.
#[derive(Serialize)]
struct ConfigureOutput {
    message: String,
    settings: Option<EmbeddingSettings>,
}

/// Execute embeddings command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or written, or the
/// test embedding fails.
pub fn execute(command: &EmbeddingsCommands, json: bool) -> Result<()> {
    match command {
        EmbeddingsCommands::Status => execute_status(json),
        EmbeddingsCommands::Configure {
            provider,
            model,
            endpoint,
            api_key,
            token,
            chunk_average,
            reset,
        } => {
            if *reset {
                reset_embedding_settings()?;
                return print_configured("Embedding settings reset".to_string(), json);
            }
            let update = ConfigureUpdate {
                provider: provider.as_deref(),
                model: model.as_deref(),
                endpoint: endpoint.as_deref(),
                api_key: api_key.as_deref(),
                token: token.as_deref(),
                chunk_average: *chunk_average,
            };
            execute_configure(&update, json)
        }
        EmbeddingsCommands::Test { text } => execute_test(text, json),
    }
}

fn active_model(config: &ResolvedEmbeddingConfig) -> (&str, &str, bool) {
    match config.provider {
        EmbeddingProviderType::Gemini => (
            config.gemini_model.as_str(),
            config.gemini_endpoint.as_str(),
            config.gemini_api_key.is_some(),
        ),
        EmbeddingProviderType::Ollama => (
            config.ollama_model.as_str(),
            config.ollama_endpoint.as_str(),
            true,
        ),
        EmbeddingProviderType::Huggingface => (
            config.hf_model.as_str(),
            config.hf_endpoint.as_str(),
            config.hf_token.is_some(),
        ),
    }
}

/// Show the resolved configuration and which providers respond.
fn execute_status(json: bool) -> Result<()> {
    let config = resolve_from_environment()?;
    let rt = runtime()?;
    let detection = rt.block_on(detect_available_providers(&config));

    let (active, error) = match create_provider(&config) {
        Ok(provider) => {
            let info = provider.info();
            let active = ActiveProviderInfo {
                name: info.name,
                model: info.model,
                dimensions: info.dimensions,
                max_chars: info.max_chars,
            };
            (Some(active), None)
        }
        Err(e) => (None, Some(e.to_string())),
    };

    let (model, endpoint, credential_set) = active_model(&config);
    let output = StatusOutput {
        provider: config.provider.to_string(),
        model: model.to_string(),
        endpoint: endpoint.to_string(),
        credential_set,
        input_policy: match config.input_policy {
            InputPolicy::Truncate => "truncate",
            InputPolicy::ChunkAverage => "chunk-average",
        },
        max_concurrency: config.max_concurrency,
        available_providers: detection.available,
        active,
        error,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Embedding Provider".bold());
    println!("  Provider:    {}", output.provider);
    println!("  Model:       {}", output.model);
    println!("  Endpoint:    {}", output.endpoint);
    println!(
        "  Credential:  {}",
        if output.credential_set {
            "set".green()
        } else {
            "missing".red()
        }
    );
    println!("  Long input:  {}", output.input_policy);
    println!("  Concurrency: {}", output.max_concurrency);
    if let Some(active) = &output.active {
        println!("  Dimensions:  {}", active.dimensions);
        println!("  Max chars:   {}", active.max_chars);
    }
    if let Some(error) = &output.error {
        println!("  {} {error}", "Error:".red());
    }
    println!();
    if output.available_providers.is_empty() {
        println!("{}", "No providers responded.".yellow());
    } else {
        println!("Responding: {}", output.available_providers.join(", "));
    }
    Ok(())
}

struct ConfigureUpdate<'a> {
    provider: Option<&'a str>,
    model: Option<&'a str>,
    endpoint: Option<&'a str>,
    api_key: Option<&'a str>,
    token: Option<&'a str>,
    chunk_average: Option<bool>,
}

fn execute_configure(update: &ConfigureUpdate<'_>, json: bool) -> Result<()> {
    let current = get_embedding_settings()?.unwrap_or_default();
    let mut settings = EmbeddingSettings::default();
    let mut messages = Vec::new();

    if let Some(raw) = update.provider {
        settings.provider = Some(raw.parse::<EmbeddingProviderType>().map_err(Error::Config)?);
        messages.push("provider");
    }

    // Model and endpoint apply to the provider being configured, or the saved one.
    let target = settings.provider.or(current.provider).unwrap_or_default();

    if let Some(model) = update.model {
        let model = Some(model.to_string());
        match target {
            EmbeddingProviderType::Gemini => settings.gemini_model = model,
            EmbeddingProviderType::Ollama => settings.ollama_model = model,
            EmbeddingProviderType::Huggingface => settings.hf_model = model,
        }
        messages.push("model");
    }

    if let Some(endpoint) = update.endpoint {
        let endpoint = Some(endpoint.to_string());
        match target {
            EmbeddingProviderType::Gemini => settings.gemini_endpoint = endpoint,
            EmbeddingProviderType::Ollama => settings.ollama_endpoint = endpoint,
            EmbeddingProviderType::Huggingface => settings.hf_endpoint = endpoint,
        }
        messages.push("endpoint");
    }

    if let Some(key) = update.api_key {
        settings.gemini_api_key = Some(key.to_string());
        messages.push("API key");
    }

    if let Some(token) = update.token {
        settings.hf_token = Some(token.to_string());
        messages.push("token");
    }

    if let Some(chunk_average) = update.chunk_average {
        settings.chunk_average = Some(chunk_average);
        messages.push("long input policy");
    }

    if messages.is_empty() {
        return execute_status(json);
    }

    save_embedding_settings(&settings)?;
    print_configured(format!("Updated {}", messages.join(", ")), json)
}

fn print_configured(message: String, json: bool) -> Result<()> {
    if json {
        let output = ConfigureOutput {
            message,
            settings: get_embedding_settings()?.map(redacted),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{} {message}", "✓".green());
    Ok(())
}

fn redacted(mut settings: EmbeddingSettings) -> EmbeddingSettings {
    let mask = |s: Option<String>| s.map(|_| "********".to_string());
    settings.gemini_api_key = mask(settings.gemini_api_key);
    settings.hf_token = mask(settings.hf_token);
    settings
}

/// Embed `text` through the full client (retry, truncation) and print a sample.
fn execute_test(text: &str, json: bool) -> Result<()> {
    let client = create_embedding_client(&resolve_from_environment()?)?;
    let info = client.info().clone();

    let rt = runtime()?;
    let embedding = rt.block_on(client.embed(text))?;
    let sample: Vec<f32> = embedding.iter().take(5).copied().collect();

    if json {
        let output = TestOutput {
            provider: info.name,
            model: info.model,
            dimensions: embedding.len(),
            input_text: text.to_string(),
            embedding_sample: sample,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Embedding Test: {}", "SUCCESS".green());
    println!();
    println!("Provider:   {}", info.name);
    println!("Model:      {}", info.model);
    println!("Dimensions: {}", embedding.len());
    println!("Input:      \"{text}\"");
    println!();
    println!("Sample (first 5 values):");
    for (i, v) in sample.iter().enumerate() {
        println!("  [{i}] {v:.6}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_masks_credentials_only() {
        let settings = EmbeddingSettings {
            gemini_api_key: Some("secret".into()),
            hf_token: None,
            gemini_model: Some("text-embedding-004".into()),
            ..Default::default()
        };
        let masked = redacted(settings);
        assert_eq!(masked.gemini_api_key.as_deref(), Some("********"));
        assert_eq!(masked.hf_token, None);
        assert_eq!(masked.gemini_model.as_deref(), Some("text-embedding-004"));
    }
}
