//! Semantic context graph.
//!
//! A flat, path-keyed map of nodes. Content nodes carry file text and its
//! embedding; path nodes keep the directory structure navigable. The graph
//! is built incrementally, persisted to a single JSON file, and answers
//! nearest-neighbour queries by cosine similarity.
//!
//! ```no_run
//! # async fn demo(client: craft::embeddings::EmbeddingClient) -> craft::Result<()> {
//! use craft::graph::ContextGraph;
//! use std::path::Path;
//!
//! let graph = ContextGraph::new(client);
//! match graph.load(Path::new(".craft-index.json")) {
//!     Ok(_) => {}
//!     Err(e) if e.is_no_prior_index() => {}
//!     Err(e) => return Err(e),
//! }
//! graph.add_file("notes/todo.md", "ship the indexer").await?;
//! for hit in graph.search("what is left to do?", 3).await? {
//!     println!("{:.3} {}", hit.similarity, hit.node.path);
//! }
//! graph.save(Path::new(".craft-index.json"))?;
//! # Ok(())
//! # }
//! ```

mod background;
mod exclude;
mod indexer;
mod node;
pub mod path;
mod persist;
pub mod search;
mod store;

pub use exclude::{ExclusionPolicy, FileContent, DEFAULT_EXCLUDED_DIRS};
pub use indexer::{AddOutcome, FailedFile, IndexOptions, IndexReport};
pub use node::{Node, NodeKind, SearchResult};
pub use persist::{read_index, write_index, IndexMeta, LoadedIndex, FORMAT_VERSION};
pub use store::NodeStore;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::cancel::CancelToken;
use crate::embeddings::EmbeddingClient;
use crate::error::{Error, Result};

/// What `load` found.
#[derive(Debug, Clone, Serialize)]
pub struct LoadOutcome {
    pub nodes: usize,
    pub content_nodes: usize,
    /// `None` for an unversioned file.
    pub version: Option<u32>,
    pub saved_at: Option<DateTime<Utc>>,
}

/// The context graph. Cheap to clone; clones share the same nodes.
#[derive(Debug, Clone)]
pub struct ContextGraph {
    client: EmbeddingClient,
    store: Arc<NodeStore>,
    exclusion: Arc<ExclusionPolicy>,
    root: Option<PathBuf>,
}

impl ContextGraph {
    /// An empty graph that embeds through `client`.
    #[must_use]
    pub fn new(client: EmbeddingClient) -> Self {
        Self {
            client,
            store: Arc::new(NodeStore::new()),
            exclusion: Arc::new(ExclusionPolicy::default()),
            root: None,
        }
    }

    #[must_use]
    pub fn with_exclusion(mut self, policy: ExclusionPolicy) -> Self {
        self.exclusion = Arc::new(policy);
        self
    }

    /// Directory that absolute paths passed to `add_file` are made relative to.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    #[must_use]
    pub fn client(&self) -> &EmbeddingClient {
        &self.client
    }

    #[must_use]
    pub fn exclusion(&self) -> &ExclusionPolicy {
        &self.exclusion
    }

    /// Populate the graph from a persisted index, replacing current nodes.
    ///
    /// # Errors
    ///
    /// - `Error::NoPriorIndex` if the file does not exist; the graph is unchanged
    /// - `Error::Format` for a corrupt file
    /// - `Error::ProviderMismatch` if the index was built with another model
    pub fn load(&self, path: &Path) -> Result<LoadOutcome> {
        let loaded = read_index(path)?;

        if let Some(meta) = &loaded.meta {
            let active = self.client.info();
            if meta.model != active.model || meta.provider != active.name {
                return Err(Error::ProviderMismatch {
                    path: path.to_path_buf(),
                    found: format!("{}/{}", meta.provider, meta.model),
                    active: format!("{}/{}", active.name, active.model),
                });
            }
        }

        if let Some(dims) = loaded.dimensions() {
            self.client.expect_dimensions(dims);
        }

        let outcome = LoadOutcome {
            nodes: loaded.nodes.len(),
            content_nodes: loaded.content_len(),
            version: loaded.version,
            saved_at: loaded.saved_at,
        };
        self.store.replace_all(loaded.nodes);

        info!(
            path = %path.display(),
            nodes = outcome.nodes,
            content_nodes = outcome.content_nodes,
            "Loaded index"
        );
        Ok(outcome)
    }

    /// Persist the graph atomically. The snapshot is consistent even while
    /// indexing continues on other tasks.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` or `Error::Json` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let (nodes, dimensions) = self.store.snapshot();
        let info = self.client.info();
        let meta = IndexMeta {
            provider: info.name.clone(),
            model: info.model.clone(),
            dimensions,
        };
        write_index(path, &meta, &nodes)?;
        info!(path = %path.display(), nodes = nodes.len(), "Saved index");
        Ok(())
    }

    /// Rank content nodes by similarity to `query`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidTopK` when `top_k` is 0
    /// - `Error::QueryEmbedding` when the query cannot be embedded
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(Error::InvalidTopK(top_k));
        }
        let vector = self
            .client
            .embed(query)
            .await
            .map_err(Error::QueryEmbedding)?;
        Ok(self.store.read(|nodes| search::rank(&vector, nodes.values(), top_k)))
    }

    /// `search`, abandoned if `cancel` fires first.
    ///
    /// # Errors
    ///
    /// As [`ContextGraph::search`], plus `Error::Cancelled`.
    pub async fn search_with_cancel(
        &self,
        query: &str,
        top_k: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<SearchResult>> {
        cancel.run(self.search(query, top_k)).await?
    }

    /// Total number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    #[must_use]
    pub fn content_len(&self) -> usize {
        self.store.content_len()
    }

    #[must_use]
    pub fn path_len(&self) -> usize {
        self.len() - self.content_len()
    }

    /// Embedding length shared by all content nodes.
    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.store.dimensions()
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<Node> {
        path::normalize(path).ok().and_then(|p| self.store.get(&p))
    }

    /// Every node in path order.
    #[must_use]
    pub fn nodes(&self) -> Vec<Node> {
        self.store.all()
    }

    /// Direct children of a hierarchy node. An empty `path` (or `.`) lists
    /// the top level.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPath` if `path` cannot be normalised.
    pub fn children(&self, path: &str) -> Result<Vec<Node>> {
        let trimmed = path.trim();
        if trimmed.is_empty() || trimmed == "." || trimmed == "./" {
            return Ok(self.store.children(""));
        }
        Ok(self.store.children(&path::normalize(trimmed)?))
    }

    /// Drop every node.
    pub fn clear(&self) {
        self.store.clear();
    }

    fn node_path(&self, raw: &str) -> Result<String> {
        let candidate = Path::new(raw);
        match &self.root {
            Some(root) if candidate.is_absolute() => path::relative_to(root, candidate),
            _ => path::normalize(raw),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic providers for graph tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::embeddings::provider::EmbeddingProvider;
    use crate::embeddings::{BoxedProvider, EmbeddingClient, ProviderInfo, RetryPolicy};
    use crate::error::{ProviderError, ProviderResult};

    /// Embeds text as its a-z letter histogram.
    pub struct LetterFrequency {
        pub calls: Arc<AtomicUsize>,
        /// Texts containing this marker fail with the given error.
        pub fail_on: Option<(String, ProviderError)>,
    }

    impl EmbeddingProvider for LetterFrequency {
        fn info(&self) -> ProviderInfo {
            ProviderInfo {
                name: "stub".into(),
                model: "letters".into(),
                dimensions: 26,
                max_chars: 10_000,
            }
        }

        async fn generate_embedding(&self, text: &str) -> ProviderResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some((marker, err)) = &self.fail_on {
                if text.contains(marker.as_str()) {
                    return Err(err.clone());
                }
            }
            let mut v = vec![0.0_f32; 26];
            for c in text.chars().filter(char::is_ascii_alphabetic) {
                v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
            }
            // Keep vectors non-zero for texts without letters.
            if v.iter().all(|x| *x == 0.0) {
                v[0] = 0.001;
            }
            Ok(v)
        }
    }

    pub fn client() -> (EmbeddingClient, Arc<AtomicUsize>) {
        client_failing_on(None)
    }

    pub fn client_failing_on(fail_on: Option<(&str, ProviderError)>) -> (EmbeddingClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = LetterFrequency {
            calls: calls.clone(),
            fail_on: fail_on.map(|(m, e)| (m.to_string(), e)),
        };
        let client = EmbeddingClient::new(BoxedProvider::new(provider)).with_retry(RetryPolicy::none());
        (client, calls)
    }
}
