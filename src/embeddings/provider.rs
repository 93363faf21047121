//! Embedding provider trait.
//!
//! Defines the interface that all embedding providers must implement.
//! Uses async methods for HTTP-based providers.

use super::types::ProviderInfo;
use crate::error::ProviderResult;

/// Trait for embedding providers.
///
/// Implemented by the Gemini, Ollama and HuggingFace providers, and by
/// deterministic stubs in tests. A provider performs exactly one network
/// call per invocation and classifies failures into [`ProviderError`];
/// retries, truncation and concurrency limits live in
/// [`EmbeddingClient`](super::client::EmbeddingClient).
///
/// [`ProviderError`]: crate::error::ProviderError
pub trait EmbeddingProvider: Send + Sync {
    /// Get provider metadata.
    fn info(&self) -> ProviderInfo;

    /// Check if the provider is reachable.
    ///
    /// Hosted providers answer from local state so the check never spends
    /// rate-limit quota.
    fn is_available(&self) -> impl std::future::Future<Output = bool> + Send {
        async { true }
    }

    /// Generate embedding for a single text.
    fn generate_embedding(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = ProviderResult<Vec<f32>>> + Send;

    /// Generate embeddings for multiple texts (batch).
    ///
    /// Default implementation calls `generate_embedding` for each text.
    fn generate_embeddings(
        &self,
        texts: &[&str],
    ) -> impl std::future::Future<Output = ProviderResult<Vec<Vec<f32>>>> + Send {
        async move {
            let mut results = Vec::with_capacity(texts.len());
            for text in texts {
                results.push(self.generate_embedding(text).await?);
            }
            Ok(results)
        }
    }
}

type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Boxed provider for dynamic dispatch.
///
/// Since the trait has async methods with `impl Future`, we need this wrapper
/// for runtime polymorphism.
pub struct BoxedProvider {
    inner: Box<dyn EmbeddingProviderBoxed + Send + Sync>,
}

/// Object-safe version of `EmbeddingProvider` for boxing.
pub trait EmbeddingProviderBoxed: Send + Sync {
    fn info(&self) -> ProviderInfo;
    fn is_available_boxed(&self) -> BoxFuture<'_, bool>;
    fn generate_embedding_boxed(&self, text: &str) -> BoxFuture<'_, ProviderResult<Vec<f32>>>;
    fn generate_embeddings_boxed(
        &self,
        texts: &[&str],
    ) -> BoxFuture<'_, ProviderResult<Vec<Vec<f32>>>>;
}

impl BoxedProvider {
    /// Create a new boxed provider.
    pub fn new<P: EmbeddingProvider + 'static>(provider: P) -> Self {
        Self {
            inner: Box::new(BoxedProviderWrapper(provider)),
        }
    }

    /// Get provider metadata.
    #[must_use]
    pub fn info(&self) -> ProviderInfo {
        self.inner.info()
    }

    /// Check if the provider is available.
    pub async fn is_available(&self) -> bool {
        self.inner.is_available_boxed().await
    }

    /// Generate embedding for a single text.
    pub async fn generate_embedding(&self, text: &str) -> ProviderResult<Vec<f32>> {
        self.inner.generate_embedding_boxed(text).await
    }

    /// Generate embeddings for multiple texts (batch).
    pub async fn generate_embeddings(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        self.inner.generate_embeddings_boxed(texts).await
    }
}

impl std::fmt::Debug for BoxedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = self.info();
        f.debug_struct("BoxedProvider")
            .field("name", &info.name)
            .field("model", &info.model)
            .finish()
    }
}

/// Wrapper to implement `EmbeddingProviderBoxed` for any `EmbeddingProvider`.
struct BoxedProviderWrapper<P: EmbeddingProvider + 'static>(P);

impl<P: EmbeddingProvider + 'static> EmbeddingProviderBoxed for BoxedProviderWrapper<P> {
    fn info(&self) -> ProviderInfo {
        self.0.info()
    }

    fn is_available_boxed(&self) -> BoxFuture<'_, bool> {
        Box::pin(self.0.is_available())
    }

    fn generate_embedding_boxed(&self, text: &str) -> BoxFuture<'_, ProviderResult<Vec<f32>>> {
        // Owned copy so the future does not borrow the caller's string.
        let text_owned = text.to_string();
        Box::pin(async move { self.0.generate_embedding(&text_owned).await })
    }

    fn generate_embeddings_boxed(
        &self,
        texts: &[&str],
    ) -> BoxFuture<'_, ProviderResult<Vec<Vec<f32>>>> {
        let texts_owned: Vec<String> = texts.iter().map(|s| (*s).to_string()).collect();
        Box::pin(async move {
            let refs: Vec<&str> = texts_owned.iter().map(String::as_str).collect();
            self.0.generate_embeddings(&refs).await
        })
    }
}
