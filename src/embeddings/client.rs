//! Embedding client: the single entry point the graph uses to embed text.
//!
//! Wraps a [`BoxedProvider`] with the policies that keep a flaky hosted
//! provider usable:
//!
//! - **Bounded fan-out**: a semaphore caps in-flight provider calls across
//!   every caller sharing the client.
//! - **Retry with backoff**: rate limits, transient network errors and 5xx
//!   responses are retried; `Retry-After` hints are honoured.
//! - **Input shaping**: oversized text is truncated or chunk-averaged.
//! - **Validation**: empty, non-finite or wrongly sized vectors are rejected,
//!   so a failed call never yields a partial vector.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::chunking::{chunk_text, mean_pool, truncate_chars, ChunkConfig};
use super::config::DEFAULT_CONCURRENCY;
use super::provider::BoxedProvider;
use super::types::ProviderInfo;
use crate::error::{ProviderError, ProviderResult};

/// Exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// No retries and no waiting.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based), honouring a server hint.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exp);
        backoff.max(hint.unwrap_or(Duration::ZERO)).min(self.max_delay)
    }
}

/// What to do with text longer than the model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputPolicy {
    /// Keep the first `max_chars` characters.
    #[default]
    Truncate,
    /// Embed overlapping chunks and average the vectors.
    ChunkAverage,
}

/// Shared embedding client. Cheap to clone; clones share the concurrency limit.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<BoxedProvider>,
    info: ProviderInfo,
    retry: RetryPolicy,
    input_policy: InputPolicy,
    permits: Arc<Semaphore>,
    concurrency: usize,
    /// Dimension of the first vector this client produced.
    dimensions: Arc<Mutex<Option<usize>>>,
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("provider", &self.info.name)
            .field("model", &self.info.model)
            .field("retry", &self.retry)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl EmbeddingClient {
    /// Create a client with default retry, truncation and concurrency.
    #[must_use]
    pub fn new(provider: BoxedProvider) -> Self {
        let info = provider.info();
        Self {
            provider: Arc::new(provider),
            info,
            retry: RetryPolicy::default(),
            input_policy: InputPolicy::default(),
            permits: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            concurrency: DEFAULT_CONCURRENCY,
            dimensions: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_input_policy(mut self, policy: InputPolicy) -> Self {
        self.input_policy = policy;
        self
    }

    /// Cap in-flight provider calls. Replaces the shared semaphore.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        self.permits = Arc::new(Semaphore::new(concurrency));
        self.concurrency = concurrency;
        self
    }

    /// Provider metadata.
    #[must_use]
    pub fn info(&self) -> &ProviderInfo {
        &self.info
    }

    /// Maximum concurrent provider calls.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Pin the expected dimension, e.g. from a loaded index.
    pub fn expect_dimensions(&self, dims: usize) {
        *self.dimensions.lock().unwrap_or_else(PoisonError::into_inner) = Some(dims);
    }

    /// Check whether the provider is reachable.
    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    /// Turn text into a vector.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::EmptyInput` for blank text, the last provider
    /// error once retries are exhausted, or the first non-retryable error.
    pub async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyInput);
        }

        let max_chars = self.info.max_chars.max(1);
        if text.chars().count() <= max_chars {
            return self.embed_one(text).await;
        }

        match self.input_policy {
            InputPolicy::Truncate => {
                debug!(
                    provider = %self.info.name,
                    max_chars,
                    "Truncating oversized input"
                );
                self.embed_one(truncate_chars(text, max_chars)).await
            }
            InputPolicy::ChunkAverage => {
                let chunks = chunk_text(text, &ChunkConfig::for_max_chars(max_chars));
                let mut vectors = Vec::with_capacity(chunks.len());
                for chunk in &chunks {
                    vectors.push(self.embed_one(&chunk.text).await?);
                }
                mean_pool(&vectors).ok_or_else(|| self.malformed("chunk vectors could not be pooled"))
            }
        }
    }

    /// One logical provider call, with permits and retries.
    async fn embed_one(&self, text: &str) -> ProviderResult<Vec<f32>> {
        let mut attempt = 1;
        loop {
            let result = {
                // A closed semaphore never happens: we never call close().
                let _permit = self.permits.acquire().await.map_err(|_| ProviderError::Transient {
                    provider: self.info.name.clone(),
                    message: "embedding client shut down".into(),
                })?;
                debug!(provider = %self.info.name, attempt, "Embedding request");
                self.provider.generate_embedding(text).await
            };

            match result.and_then(|vector| self.validate(vector)) {
                Ok(vector) => return Ok(vector),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt, err.retry_after());
                    warn!(
                        provider = %self.info.name,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Embedding call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn validate(&self, vector: Vec<f32>) -> ProviderResult<Vec<f32>> {
        if vector.is_empty() {
            return Err(self.malformed("empty embedding vector"));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(self.malformed("embedding contains non-finite values"));
        }

        let mut dims = self.dimensions.lock().unwrap_or_else(PoisonError::into_inner);
        match *dims {
            Some(expected) if expected != vector.len() => Err(self.malformed(&format!(
                "expected {expected} dimensions, got {}",
                vector.len()
            ))),
            Some(_) => Ok(vector),
            None => {
                *dims = Some(vector.len());
                Ok(vector)
            }
        }
    }

    fn malformed(&self, message: &str) -> ProviderError {
        ProviderError::MalformedResponse {
            provider: self.info.name.clone(),
            message: message.to_string(),
        }
    }
}
