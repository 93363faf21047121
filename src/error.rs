//! Error types for the Craft context graph.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (3=no index, 4=search, 5=index, etc.)
//! - Retryability flags, both for provider calls and for callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Craft operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for a single embedding provider call.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

// ── Provider Error ────────────────────────────────────────────

/// Failure of one call against an embedding provider.
///
/// The variants split into a retryable subset (rate limits, transient
/// network failures, 5xx responses) and a fatal subset (authentication,
/// other client errors, malformed responses).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{provider} rejected the credential ({status}): {message}")]
    Auth {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} rate limit exceeded: {message}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("{provider} request failed: {message}")]
    Transient { provider: String, message: String },

    #[error("{provider} API error ({status}): {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} returned a malformed response: {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("Cannot embed empty text")]
    EmptyInput,
}

impl ProviderError {
    /// Whether the embedding client should try the call again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Transient { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Auth { .. } | Self::MalformedResponse { .. } | Self::EmptyInput => false,
        }
    }

    /// Whether this failure means the credential itself is bad.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Server-provided wait hint, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Classify a non-success HTTP status into a provider error.
    #[must_use]
    pub fn from_status(
        provider: &str,
        status: u16,
        retry_after: Option<Duration>,
        message: String,
    ) -> Self {
        let provider = provider.to_string();
        match status {
            401 | 403 => Self::Auth {
                provider,
                status,
                message,
            },
            429 => Self::RateLimited {
                provider,
                retry_after,
                message,
            },
            _ => Self::Http {
                provider,
                status,
                message,
            },
        }
    }
}

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Agents match on the string; shell scripts on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // No prior index (exit 3)
    IndexNotFound,

    // Search (exit 4)
    InvalidTopK,
    QueryEmbeddingFailed,

    // Indexing (exit 5)
    IndexFailed,
    InvalidPath,
    DimensionMismatch,

    // Persisted index (exit 6)
    FormatError,
    ProviderMismatch,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Provider (exit 9)
    ProviderAuth,
    ProviderRateLimited,
    ProviderError,

    // Cancelled (exit 10)
    Cancelled,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::IndexNotFound => "INDEX_NOT_FOUND",
            Self::InvalidTopK => "INVALID_TOP_K",
            Self::QueryEmbeddingFailed => "QUERY_EMBEDDING_FAILED",
            Self::IndexFailed => "INDEX_FAILED",
            Self::InvalidPath => "INVALID_PATH",
            Self::DimensionMismatch => "DIMENSION_MISMATCH",
            Self::FormatError => "FORMAT_ERROR",
            Self::ProviderMismatch => "PROVIDER_MISMATCH",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::ProviderAuth => "PROVIDER_AUTH",
            Self::ProviderRateLimited => "PROVIDER_RATE_LIMITED",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-10).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::IndexNotFound => 3,
            Self::InvalidTopK | Self::QueryEmbeddingFailed => 4,
            Self::IndexFailed | Self::InvalidPath | Self::DimensionMismatch => 5,
            Self::FormatError | Self::ProviderMismatch => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
            Self::ProviderAuth | Self::ProviderRateLimited | Self::ProviderError => 9,
            Self::Cancelled => 10,
        }
    }

    /// Whether a caller may reasonably retry the whole operation.
    ///
    /// True for rate limits, failed query embeddings, cancellations and
    /// bad arguments. False for credentials, corrupt indexes or I/O.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidTopK
                | Self::QueryEmbeddingFailed
                | Self::IndexFailed
                | Self::InvalidPath
                | Self::ProviderRateLimited
                | Self::Cancelled
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in context graph operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to index {path}: {source}")]
    Index {
        path: String,
        #[source]
        source: ProviderError,
    },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Embedding for {path} has {actual} dimensions, graph uses {expected}")]
    DimensionMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("No prior index at {}", path.display())]
    NoPriorIndex { path: PathBuf },

    #[error("Corrupt index file {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("Index {} was built with {found}, active provider is {active}", path.display())]
    ProviderMismatch {
        path: PathBuf,
        found: String,
        active: String,
    },

    #[error("top_k must be a positive integer, got {0}")]
    InvalidTopK(usize),

    #[error("Failed to embed search query: {0}")]
    QueryEmbedding(#[source] ProviderError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Provider(e) => match e {
                ProviderError::Auth { .. } => ErrorCode::ProviderAuth,
                ProviderError::RateLimited { .. } => ErrorCode::ProviderRateLimited,
                _ => ErrorCode::ProviderError,
            },
            Self::Index { source, .. } => match source {
                ProviderError::Auth { .. } => ErrorCode::ProviderAuth,
                _ => ErrorCode::IndexFailed,
            },
            Self::InvalidPath { .. } => ErrorCode::InvalidPath,
            Self::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            Self::NoPriorIndex { .. } => ErrorCode::IndexNotFound,
            Self::Format { .. } => ErrorCode::FormatError,
            Self::ProviderMismatch { .. } => ErrorCode::ProviderMismatch,
            Self::InvalidTopK(_) => ErrorCode::InvalidTopK,
            Self::QueryEmbedding(e) => match e {
                ProviderError::Auth { .. } => ErrorCode::ProviderAuth,
                _ => ErrorCode::QueryEmbeddingFailed,
            },
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// True for the "no prior index" condition callers treat as non-fatal.
    #[must_use]
    pub const fn is_no_prior_index(&self) -> bool {
        matches!(self, Self::NoPriorIndex { .. })
    }

    /// True when the underlying provider rejected the credential.
    ///
    /// Bulk indexing aborts on this instead of skipping the file.
    #[must_use]
    pub const fn is_provider_auth(&self) -> bool {
        matches!(
            self,
            Self::Provider(ProviderError::Auth { .. })
                | Self::Index {
                    source: ProviderError::Auth { .. },
                    ..
                }
                | Self::QueryEmbedding(ProviderError::Auth { .. })
        )
    }

    /// Context-aware recovery hint for agents and humans.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NoPriorIndex { .. } => {
                Some("Run `craft index` to build the context index".to_string())
            }

            Self::Format { path, .. } => Some(format!(
                "The index at {} could not be read. Rebuild it with `craft index --rebuild`.",
                path.display()
            )),

            Self::ProviderMismatch { .. } => Some(
                "Embeddings from different models cannot be mixed. \
                 Rebuild with `craft index --rebuild`."
                    .to_string(),
            ),

            Self::DimensionMismatch { .. } => Some(
                "The provider returned vectors of a different size than the index. \
                 Rebuild with `craft index --rebuild`."
                    .to_string(),
            ),

            Self::InvalidTopK(_) => Some("Pass a result count of at least 1, e.g. `-k 5`".into()),

            Self::Config(msg) if msg.contains("GEMINI_API_KEY") => Some(
                "Set GEMINI_API_KEY in the environment or a .env file, \
                 or pick another provider with CRAFT_EMBEDDING_PROVIDER"
                    .to_string(),
            ),

            Self::Config(msg) if msg.contains("HF_TOKEN") => Some(
                "Set HF_TOKEN or run `craft embeddings configure --token <token>`".to_string(),
            ),

            Self::Provider(ProviderError::Auth { .. }) | Self::Index { .. }
                if self.is_provider_auth() =>
            {
                Some("Check that the embedding API key is valid".to_string())
            }

            Self::Provider(ProviderError::RateLimited { .. }) => Some(
                "The provider is rate limiting requests. Lower --concurrency or retry later."
                    .to_string(),
            ),

            Self::Cancelled => Some("Re-run with a larger --timeout".to_string()),

            Self::Config(_)
            | Self::Provider(_)
            | Self::Index { .. }
            | Self::InvalidPath { .. }
            | Self::QueryEmbedding(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint. Agents parse this instead of stderr text.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
