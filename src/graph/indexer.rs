//! Single-file and whole-tree indexing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::exclude::{ExclusionPolicy, FileContent};
use super::node::Node;
use super::{path, ContextGraph};
use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// What `add_file` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    /// Embedded and stored as a content node.
    Added,
    /// Stored as a path node without an embedding.
    PathNode,
    /// Same content was already embedded; no provider call was made.
    Unchanged,
}

/// Options for a bulk indexing run.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Remove nodes under the root that the walk did not produce.
    pub prune: bool,
    /// Files processed at once. Defaults to the client's concurrency.
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub error: String,
}

/// Summary of a bulk indexing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub scanned: usize,
    pub added: usize,
    pub unchanged: usize,
    pub path_nodes: usize,
    pub pruned: usize,
    pub failed: Vec<FailedFile>,
    /// The run stopped early on a cancel signal or deadline.
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl IndexReport {
    fn record(&mut self, outcome: AddOutcome) {
        match outcome {
            AddOutcome::Added => self.added += 1,
            AddOutcome::PathNode => self.path_nodes += 1,
            AddOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// A file found by the walk.
struct WalkedFile {
    node_path: String,
    absolute: PathBuf,
}

/// Node key for `entry` under `base`; `base` itself is the empty key.
fn key_for(base: &Path, entry: &Path) -> Result<String> {
    if entry == base {
        return Ok(String::new());
    }
    path::relative_to(base, entry)
}

/// What a walk produced.
#[derive(Default)]
struct Walk {
    files: Vec<WalkedFile>,
    /// Keys of entries the walk could not read; their contents are unknown.
    unreadable: Vec<String>,
}

/// Walk `root`, pruning excluded directories. Files are keyed relative to
/// `base`. Unreadable entries are reported in `failed` and skipped.
fn walk(
    base: &Path,
    root: &Path,
    policy: &ExclusionPolicy,
    cancel: &CancelToken,
    failed: &mut Vec<FailedFile>,
) -> Walk {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(ExclusionPolicy::is_excluded_dir_name)
        });

    let mut out = Walk::default();
    for entry in walker {
        if cancel.is_cancelled() {
            break;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let at = e.path().unwrap_or(root);
                // Anything the key cannot name falls back to the whole walk.
                let key = key_for(base, at)
                    .or_else(|_| key_for(base, root))
                    .unwrap_or_default();
                warn!(path = %at.display(), error = %e, "Skipping unreadable entry");
                failed.push(FailedFile {
                    path: if key.is_empty() { ".".into() } else { key.clone() },
                    error: e.to_string(),
                });
                out.unreadable.push(key);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match key_for(base, entry.path()) {
            Ok(node_path) if node_path.is_empty() || policy.is_skipped(&node_path) => {}
            Ok(node_path) => out.files.push(WalkedFile {
                node_path,
                absolute: entry.path().to_path_buf(),
            }),
            Err(e) => failed.push(FailedFile {
                path: entry.path().display().to_string(),
                error: e.to_string(),
            }),
        }
    }
    out
}

impl ContextGraph {
    /// Index one file.
    ///
    /// Empty content and excluded paths become path nodes. Content that is
    /// already stored with an embedding is left alone. Otherwise the content
    /// is embedded and the node replaced. Missing ancestor path nodes are
    /// always synthesised.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidPath` if the path cannot be normalised
    /// - `Error::Index` if embedding fails; the node at `path` is unchanged
    /// - `Error::DimensionMismatch` if the vector does not fit the graph
    pub async fn add_file(&self, path: &str, content: &str) -> Result<AddOutcome> {
        let node_path = self.node_path(path)?;

        if content.trim().is_empty() || self.exclusion.is_excluded(&node_path) {
            self.store.upsert(Node::path_node(node_path))?;
            return Ok(AddOutcome::PathNode);
        }

        if let Some(existing) = self.store.get(&node_path) {
            if existing.is_content() && existing.content == content {
                self.store.ensure_ancestors(&node_path);
                debug!(path = %node_path, "Content unchanged, skipping embedding");
                return Ok(AddOutcome::Unchanged);
            }
        }

        let embedding = self.client.embed(content).await.map_err(|source| Error::Index {
            path: node_path.clone(),
            source,
        })?;
        self.store
            .upsert(Node::content_node(node_path, content, embedding))?;
        Ok(AddOutcome::Added)
    }

    /// Read a file from disk and index it under `node_path`.
    async fn add_walked(&self, file: &WalkedFile) -> Result<AddOutcome> {
        let bytes = std::fs::read(&file.absolute)?;
        match self.exclusion.classify(bytes) {
            FileContent::Text(text) => self.add_file(&file.node_path, &text).await,
            FileContent::Binary | FileContent::TooLarge => {
                self.store.upsert(Node::path_node(file.node_path.clone()))?;
                Ok(AddOutcome::PathNode)
            }
        }
    }

    /// Index every file under `root`.
    ///
    /// Nodes are keyed relative to the graph root when one is set, so a
    /// subdirectory can be indexed into a project-wide graph; otherwise
    /// relative to `root`. Files are processed concurrently; the embedding
    /// client caps in-flight provider calls. A failing file is logged,
    /// recorded in the report and skipped. A rejected credential aborts the
    /// run. Cancellation stops the run promptly: finished files stay
    /// indexed, in-flight ones are dropped.
    ///
    /// Pruning only touches the walked subtree, and never removes nodes
    /// under an entry the walk could not read.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidPath` if `root` lies outside the graph root
    /// - `Error::Index` wrapping `ProviderError::Auth` when the provider
    ///   rejects the credential
    pub async fn index_tree(
        &self,
        root: &Path,
        options: &IndexOptions,
        cancel: &CancelToken,
    ) -> Result<IndexReport> {
        let started = Instant::now();
        let mut report = IndexReport::default();

        let base = self.root.as_deref().unwrap_or(root);
        let subtree = key_for(base, root)?;

        let Walk { files, unreadable } = walk(base, root, &self.exclusion, cancel, &mut report.failed);
        report.scanned = files.len();
        let width = options
            .concurrency
            .unwrap_or_else(|| self.client.concurrency())
            .max(1);
        info!(root = %root.display(), subtree = %subtree, files = files.len(), width, "Indexing tree");

        let seen: HashSet<String> = files.iter().map(|f| f.node_path.clone()).collect();

        let results = stream::iter(files)
            .map(|file| {
                let graph = self.clone();
                async move {
                    let result = graph.add_walked(&file).await;
                    (file, result)
                }
            })
            .buffer_unordered(width);
        let mut results = std::pin::pin!(results);
        let cancelled = cancel.cancelled();
        let mut cancelled = std::pin::pin!(cancelled);

        loop {
            let next = tokio::select! {
                biased;
                () = &mut cancelled => {
                    report.cancelled = true;
                    break;
                }
                next = results.next() => next,
            };
            let Some((file, result)) = next else {
                break;
            };

            match result {
                Ok(outcome) => report.record(outcome),
                Err(e) if e.is_provider_auth() => {
                    warn!(path = %file.node_path, error = %e, "Provider rejected credential, aborting");
                    return Err(e);
                }
                Err(e) => {
                    warn!(path = %file.node_path, error = %e, "Failed to index file");
                    report.failed.push(FailedFile {
                        path: file.node_path,
                        error: e.to_string(),
                    });
                }
            }
        }

        if cancel.is_cancelled() {
            report.cancelled = true;
        }
        if options.prune && !report.cancelled {
            report.pruned = self.prune_missing(&subtree, &seen, &unreadable);
        }

        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            added = report.added,
            unchanged = report.unchanged,
            path_nodes = report.path_nodes,
            failed = report.failed.len(),
            pruned = report.pruned,
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed_ms,
            "Indexing finished"
        );
        Ok(report)
    }

    /// Remove nodes under `dir` (`""` for the whole graph) that are not in
    /// `seen`, are not ancestors of a seen path, and do not lie under one of
    /// the `unknown` prefixes. Returns how many were removed.
    pub fn prune_missing(&self, dir: &str, seen: &HashSet<String>, unknown: &[String]) -> usize {
        let removed = self.store.prune_under(dir, seen, unknown);
        if removed > 0 {
            info!(removed, "Pruned stale nodes");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::graph::testing::{client, client_failing_on};
    use std::fs;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &[u8])]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, body) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_add_file_outcomes() {
        let (client, calls) = client();
        let graph = ContextGraph::new(client);

        assert_eq!(graph.add_file("a.txt", "apple").await.unwrap(), AddOutcome::Added);
        assert_eq!(graph.add_file("empty.txt", "  ").await.unwrap(), AddOutcome::PathNode);
        assert_eq!(
            graph.add_file("node_modules/x/index.js", "module.exports = 1").await.unwrap(),
            AddOutcome::PathNode
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(graph.get("node_modules").is_some());
        assert!(graph.get("node_modules/x").is_some());
    }

    #[tokio::test]
    async fn test_re_adding_same_content_is_idempotent() {
        let (client, calls) = client();
        let graph = ContextGraph::new(client);

        graph.add_file("src/a.rs", "fn a() {}").await.unwrap();
        let first = graph.get("src/a.rs").unwrap();
        assert_eq!(
            graph.add_file("./src/a.rs", "fn a() {}").await.unwrap(),
            AddOutcome::Unchanged
        );

        assert_eq!(graph.get("src/a.rs").unwrap(), first);
        assert_eq!(graph.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(graph.add_file("src/a.rs", "fn b() {}").await.unwrap(), AddOutcome::Added);
        assert_eq!(graph.get("src/a.rs").unwrap().content, "fn b() {}");
    }

    #[tokio::test]
    async fn test_failed_embedding_leaves_node_unchanged() {
        let failure = ProviderError::Http {
            provider: "stub".into(),
            status: 400,
            message: "bad request".into(),
        };
        let (client, _) = client_failing_on(Some(("poison", failure)));
        let graph = ContextGraph::new(client);

        graph.add_file("a.txt", "apple").await.unwrap();
        let err = graph.add_file("a.txt", "poison apple").await.unwrap_err();
        assert!(matches!(err, Error::Index { ref path, .. } if path == "a.txt"));
        assert_eq!(graph.get("a.txt").unwrap().content, "apple");
    }

    #[tokio::test]
    async fn test_invalid_paths_are_rejected() {
        let (client, _) = client();
        let graph = ContextGraph::new(client);
        assert!(matches!(
            graph.add_file("../outside.txt", "x").await,
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            graph.add_file("/abs/file.txt", "x").await,
            Err(Error::InvalidPath { .. })
        ));
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn test_absolute_paths_under_root() {
        let dir = TempDir::new().unwrap();
        let (client, _) = client();
        let graph = ContextGraph::new(client).with_root(dir.path());
        let file = dir.path().join("docs").join("guide.md");

        graph.add_file(file.to_str().unwrap(), "read me").await.unwrap();
        assert!(graph.get("docs/guide.md").unwrap().is_content());
    }

    #[tokio::test]
    async fn test_index_tree() {
        let dir = tree(&[
            ("src/main.rs", b"fn main() {}"),
            ("src/lib.rs", b"pub mod graph;"),
            ("assets/logo.png", b"\x89PNG\0\0"),
            ("node_modules/pkg/index.js", b"module.exports = {}"),
            ("target/debug/out.txt", b"artifact"),
            ("empty.txt", b""),
        ]);
        let (client, calls) = client();
        let graph = ContextGraph::new(client);

        let report = graph
            .index_tree(dir.path(), &IndexOptions::default(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.scanned, 4);
        assert_eq!(report.added, 2);
        assert_eq!(report.path_nodes, 2);
        assert!(report.failed.is_empty());
        assert!(!report.cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(graph.get("assets/logo.png").is_some_and(|n| !n.is_content()));
        assert!(graph.get("node_modules").is_none());
        assert!(graph.get("target").is_none());
        assert!(graph.get("src").is_some());

        // A second pass re-embeds nothing.
        let again = graph
            .index_tree(dir.path(), &IndexOptions::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(again.unchanged, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_one_bad_file_does_not_stop_the_walk() {
        let dir = tree(&[
            ("a.txt", b"apple"),
            ("b.txt", b"poison"),
            ("c.txt", b"cherry"),
        ]);
        let failure = ProviderError::MalformedResponse {
            provider: "stub".into(),
            message: "garbage".into(),
        };
        let (client, _) = client_failing_on(Some(("poison", failure)));
        let graph = ContextGraph::new(client);

        let report = graph
            .index_tree(dir.path(), &IndexOptions::default(), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "b.txt");
        assert!(graph.get("b.txt").is_none());
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_the_walk() {
        let dir = tree(&[("a.txt", b"apple"), ("b.txt", b"banana")]);
        let auth = ProviderError::Auth {
            provider: "stub".into(),
            status: 401,
            message: "invalid key".into(),
        };
        let (client, _) = client_failing_on(Some(("a", auth)));
        let graph = ContextGraph::new(client);

        let err = graph
            .index_tree(dir.path(), &IndexOptions::default(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(err.is_provider_auth());
    }

    #[tokio::test]
    async fn test_cancelled_run_stops_early() {
        let dir = tree(&[("a.txt", b"apple"), ("b.txt", b"banana")]);
        let (client, calls) = client();
        let graph = ContextGraph::new(client);
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = graph
            .index_tree(dir.path(), &IndexOptions::default(), &cancel)
            .await
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(graph.is_empty());

        let expired = CancelToken::with_timeout(Duration::ZERO);
        let report = graph
            .index_tree(dir.path(), &IndexOptions::default(), &expired)
            .await
            .unwrap();
        assert!(report.cancelled);
    }

    #[tokio::test]
    async fn test_prune_removes_deleted_files() {
        let dir = tree(&[("keep.txt", b"keep"), ("old/gone.txt", b"gone")]);
        let (client, _) = client();
        let graph = ContextGraph::new(client);
        graph
            .index_tree(dir.path(), &IndexOptions::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(graph.len(), 3);

        fs::remove_dir_all(dir.path().join("old")).unwrap();

        let report = graph
            .index_tree(dir.path(), &IndexOptions::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(report.pruned, 0);
        assert!(graph.get("old/gone.txt").is_some());

        let prune = IndexOptions {
            prune: true,
            ..Default::default()
        };
        let report = graph
            .index_tree(dir.path(), &prune, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(report.pruned, 2);
        let paths: Vec<String> = graph.nodes().into_iter().map(|n| n.path).collect();
        assert_eq!(paths, ["keep.txt"]);
    }

    #[tokio::test]
    async fn test_indexing_a_subdirectory_keeps_project_keys() {
        let dir = tree(&[
            ("top.md", b"top"),
            ("sub/x.rs", b"fn x() {}"),
            ("sub/old.rs", b"fn old() {}"),
        ]);
        let (client, calls) = client();
        let graph = ContextGraph::new(client).with_root(dir.path());
        graph
            .index_tree(dir.path(), &IndexOptions::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        fs::remove_file(dir.path().join("sub/old.rs")).unwrap();
        fs::write(dir.path().join("sub/new.rs"), "fn new() {}").unwrap();

        let prune = IndexOptions {
            prune: true,
            ..Default::default()
        };
        let report = graph
            .index_tree(&dir.path().join("sub"), &prune, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.added, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.pruned, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let paths: Vec<String> = graph.nodes().into_iter().map(|n| n.path).collect();
        assert_eq!(paths, ["sub", "sub/new.rs", "sub/x.rs", "top.md"]);
    }

    #[tokio::test]
    async fn test_walk_root_outside_graph_root_is_rejected() {
        let project = tree(&[("a.txt", b"apple")]);
        let elsewhere = tree(&[("b.txt", b"banana")]);
        let (client, calls) = client();
        let graph = ContextGraph::new(client).with_root(project.path());

        let err = graph
            .index_tree(elsewhere.path(), &IndexOptions::default(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn test_skipped_index_file_is_not_indexed() {
        let dir = tree(&[("a.txt", b"apple"), (".craft-index.json", b"{}")]);
        let (client, _) = client();
        let graph = ContextGraph::new(client)
            .with_exclusion(ExclusionPolicy::default().skip_file(".craft-index.json"));

        let report = graph
            .index_tree(dir.path(), &IndexOptions::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(report.scanned, 1);
        assert!(graph.get(".craft-index.json").is_none());
    }
}
