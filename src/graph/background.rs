//! Background units of work for interactive callers.
//!
//! An input/render loop must not wait on network I/O. These spawn the
//! indexing or search onto the tokio runtime and hand back a `JoinHandle`
//! the caller can poll, await, or abort. The graph is shared, so nodes
//! committed by a background run are visible to the caller immediately.

use std::path::PathBuf;

use tokio::task::JoinHandle;

use super::indexer::{IndexOptions, IndexReport};
use super::node::SearchResult;
use super::ContextGraph;
use crate::cancel::CancelToken;
use crate::error::Result;

impl ContextGraph {
    /// Run [`ContextGraph::index_tree`] on a spawned task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_index(
        &self,
        root: PathBuf,
        options: IndexOptions,
        cancel: CancelToken,
    ) -> JoinHandle<Result<IndexReport>> {
        let graph = self.clone();
        tokio::spawn(async move { graph.index_tree(&root, &options, &cancel).await })
    }

    /// Run [`ContextGraph::search_with_cancel`] on a spawned task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_search(
        &self,
        query: String,
        top_k: usize,
        cancel: CancelToken,
    ) -> JoinHandle<Result<Vec<SearchResult>>> {
        let graph = self.clone();
        tokio::spawn(async move { graph.search_with_cancel(&query, top_k, &cancel).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::graph::testing::client;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_background_index_then_search() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "apple").unwrap();
        fs::write(dir.path().join("b.txt"), "banana").unwrap();

        let (client, _) = client();
        let graph = ContextGraph::new(client);

        let report = graph
            .spawn_index(dir.path().to_path_buf(), IndexOptions::default(), CancelToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(graph.content_len(), 2);

        let results = graph
            .spawn_search("apple".into(), 1, CancelToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(results[0].node.path, "a.txt");
    }

    #[tokio::test]
    async fn test_cancelled_background_search() {
        let (client, _) = client();
        let graph = ContextGraph::new(client);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = graph
            .spawn_search("apple".into(), 3, cancel)
            .await
            .unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
