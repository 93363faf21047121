//! Embedding provider client.
//!
//! Turns text into fixed-length vectors through a hosted or local
//! embedding API:
//! - **Gemini** (hosted, default) - requires `GEMINI_API_KEY`
//! - **Ollama** (local) - no credential
//! - **HuggingFace** (hosted) - requires `HF_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  ContextGraph    │
//! │ (index / search) │
//! └────────┬─────────┘
//!          │ embed(text)
//!          ▼
//! ┌──────────────────┐
//! │ EmbeddingClient  │  ← retry/backoff, in-flight cap, truncation, validation
//! └────────┬─────────┘
//!          │
//!     ┌────┼─────────┐
//!     ▼    ▼         ▼
//! ┌──────┐┌──────┐┌───────────┐
//! │Gemini││Ollama││HuggingFace│
//! └──────┘└──────┘└───────────┘
//! ```
//!
//! # Configuration
//!
//! Settings are loaded from `~/.craft/config.json`. Environment variables
//! take precedence:
//! - `CRAFT_EMBEDDING_PROVIDER` - `gemini`, `ollama` or `huggingface`
//! - `GEMINI_API_KEY`, `GEMINI_MODEL` (default: `text-embedding-004`)
//! - `OLLAMA_ENDPOINT` (default: `http://localhost:11434`), `OLLAMA_MODEL`
//! - `HF_TOKEN`, `HF_MODEL`, `HF_ENDPOINT`
//! - `CRAFT_INDEX_CONCURRENCY` - in-flight embedding calls (1-8, default 4)

pub mod chunking;
pub mod client;
pub mod config;
pub mod factory;
pub mod gemini;
mod http;
pub mod huggingface;
pub mod ollama;
pub mod provider;
pub mod types;

pub use client::{EmbeddingClient, InputPolicy, RetryPolicy};
pub use config::{
    get_embedding_settings, reset_embedding_settings, resolve_embedding_config,
    resolve_from_environment, save_embedding_settings, ResolvedEmbeddingConfig,
};
pub use factory::{
    create_embedding_client, create_provider, detect_available_providers, ProviderDetection,
};
pub use gemini::GeminiProvider;
pub use huggingface::HuggingFaceProvider;
pub use ollama::OllamaProvider;
pub use provider::{BoxedProvider, EmbeddingProvider};
pub use types::{CraftConfig, EmbeddingProviderType, EmbeddingSettings, ProviderInfo};
