//! In-memory node store.
//!
//! A path-keyed `BTreeMap` behind a `RwLock`. Writers replace whole nodes
//! under the write lock, so readers and `snapshot` never observe a
//! half-updated node. The store also owns the graph-wide embedding
//! dimension: the first content node fixes it and every later content
//! node must match.

use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::node::Node;
use super::path;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Inner {
    nodes: BTreeMap<String, Node>,
    dimensions: Option<usize>,
}

impl Inner {
    fn insert_ancestors(&mut self, node_path: &str) {
        for ancestor in path::ancestors(node_path) {
            if !self.nodes.contains_key(ancestor) {
                self.nodes
                    .insert(ancestor.to_string(), Node::path_node(ancestor));
            }
        }
    }

    fn refresh_dimensions(&mut self) {
        if !self.nodes.values().any(Node::is_content) {
            self.dimensions = None;
        }
    }
}

/// Thread-safe node map.
#[derive(Debug, Default)]
pub struct NodeStore {
    inner: RwLock<Inner>,
}

impl NodeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the node at `node.path`, then add any missing
    /// ancestor path nodes, in one critical section.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if a content node's embedding length
    /// differs from the graph's. The store is unchanged in that case.
    pub fn upsert(&self, node: Node) -> Result<()> {
        let mut inner = self.write_guard();

        if node.is_content() {
            let actual = node.embedding.len();
            match inner.dimensions {
                Some(expected) if expected != actual => {
                    return Err(Error::DimensionMismatch {
                        path: node.path,
                        expected,
                        actual,
                    });
                }
                Some(_) => {}
                None => inner.dimensions = Some(actual),
            }
        }

        inner.insert_ancestors(&node.path);
        let replaced_content = inner
            .nodes
            .insert(node.path.clone(), node)
            .is_some_and(|old| old.is_content());
        if replaced_content {
            inner.refresh_dimensions();
        }
        Ok(())
    }

    /// Add missing ancestors of `node_path` without touching the node itself.
    pub fn ensure_ancestors(&self, node_path: &str) {
        self.write_guard().insert_ancestors(node_path);
    }

    #[must_use]
    pub fn get(&self, node_path: &str) -> Option<Node> {
        self.read_guard().nodes.get(node_path).cloned()
    }

    /// Every node, in path order.
    #[must_use]
    pub fn all(&self) -> Vec<Node> {
        self.read_guard().nodes.values().cloned().collect()
    }

    /// Run `f` against the map under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&BTreeMap<String, Node>) -> R) -> R {
        f(&self.read_guard().nodes)
    }

    /// Consistent copy of the map and dimension.
    #[must_use]
    pub fn snapshot(&self) -> (BTreeMap<String, Node>, Option<usize>) {
        let inner = self.read_guard();
        (inner.nodes.clone(), inner.dimensions)
    }

    /// Replace the whole map, synthesising missing ancestors.
    ///
    /// Callers validate `nodes` first; the dimension is taken from the
    /// first content node.
    pub fn replace_all(&self, nodes: BTreeMap<String, Node>) {
        let mut fresh = Inner {
            dimensions: nodes
                .values()
                .find(|n| n.is_content())
                .map(|n| n.embedding.len()),
            nodes,
        };
        let keys: Vec<String> = fresh.nodes.keys().cloned().collect();
        for key in &keys {
            fresh.insert_ancestors(key);
        }
        *self.write_guard() = fresh;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read_guard().nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_guard().nodes.is_empty()
    }

    #[must_use]
    pub fn content_len(&self) -> usize {
        self.read_guard().nodes.values().filter(|n| n.is_content()).count()
    }

    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.read_guard().dimensions
    }

    /// Direct children of `dir` (`""` for top level), in path order.
    #[must_use]
    pub fn children(&self, dir: &str) -> Vec<Node> {
        self.read_guard()
            .nodes
            .values()
            .filter(|n| path::parent(&n.path).unwrap_or("") == dir)
            .cloned()
            .collect()
    }

    /// Remove nodes under `dir` that are neither in `keep` nor an ancestor
    /// of a kept path. Nodes under an `unknown` prefix are always kept.
    /// Returns the number removed.
    pub fn prune_under(&self, dir: &str, keep: &HashSet<String>, unknown: &[String]) -> usize {
        let mut retained: HashSet<&str> = HashSet::with_capacity(keep.len() * 2);
        for kept in keep.iter().chain(unknown) {
            retained.insert(kept.as_str());
            retained.extend(path::ancestors(kept));
        }

        let mut inner = self.write_guard();
        let before = inner.nodes.len();
        inner
            .nodes
            .retain(|p, _| {
                !path::is_within(p, dir)
                    || retained.contains(p.as_str())
                    || unknown.iter().any(|u| path::is_within(p, u))
            });
        let removed = before - inner.nodes.len();
        if removed > 0 {
            inner.refresh_dimensions();
        }
        removed
    }

    pub fn clear(&self) {
        *self.write_guard() = Inner::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_upsert_synthesises_ancestors() {
        let store = NodeStore::new();
        store
            .upsert(Node::content_node("a/b/c.rs", "fn main() {}", vec![1.0, 0.0]))
            .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("a").unwrap(), Node::path_node("a"));
        assert_eq!(store.get("a/b").unwrap(), Node::path_node("a/b"));
        assert!(store.get("a/b/c.rs").unwrap().is_content());
        assert_eq!(store.content_len(), 1);
        assert_eq!(store.dimensions(), Some(2));
    }

    #[test]
    fn test_upsert_replaces_whole_node() {
        let store = NodeStore::new();
        store.upsert(Node::content_node("x", "old", vec![1.0, 2.0])).unwrap();
        store.upsert(Node::content_node("x", "new", vec![3.0, 4.0])).unwrap();

        let node = store.get("x").unwrap();
        assert_eq!(node.content, "new");
        assert_eq!(node.embedding, vec![3.0, 4.0]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_dimension_invariant() {
        let store = NodeStore::new();
        store.upsert(Node::content_node("a", "a", vec![1.0, 2.0])).unwrap();

        let err = store
            .upsert(Node::content_node("b", "b", vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
        assert!(store.get("b").is_none());

        // Path nodes carry no vector and are always accepted.
        store.upsert(Node::path_node("c")).unwrap();
    }

    #[test]
    fn test_dimension_resets_when_last_content_node_goes() {
        let store = NodeStore::new();
        store.upsert(Node::content_node("a", "a", vec![1.0, 2.0])).unwrap();
        store.upsert(Node::path_node("a")).unwrap();
        assert_eq!(store.dimensions(), None);
        store.upsert(Node::content_node("a", "a", vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(store.dimensions(), Some(3));
    }

    #[test]
    fn test_children() {
        let store = NodeStore::new();
        store.upsert(Node::content_node("src/a.rs", "a", vec![1.0])).unwrap();
        store.upsert(Node::content_node("src/sub/b.rs", "b", vec![1.0])).unwrap();
        store.upsert(Node::content_node("README.md", "r", vec![1.0])).unwrap();

        let top: Vec<String> = store.children("").into_iter().map(|n| n.path).collect();
        assert_eq!(top, ["README.md", "src"]);
        let src: Vec<String> = store.children("src").into_iter().map(|n| n.path).collect();
        assert_eq!(src, ["src/a.rs", "src/sub"]);
    }

    #[test]
    fn test_prune_keeps_seen_paths_and_their_ancestors() {
        let store = NodeStore::new();
        for p in ["src/a.rs", "src/gone.rs", "old/x.rs", "docs/keep.md"] {
            store.upsert(Node::content_node(p, p, vec![1.0])).unwrap();
        }
        let keep: HashSet<String> = ["src/a.rs".to_string()].into_iter().collect();

        let removed = store.prune_under("src", &keep, &[]);
        assert_eq!(removed, 1);
        assert!(store.get("src").is_some());
        assert!(store.get("old/x.rs").is_some());

        let removed = store.prune_under("", &keep, &[]);
        assert_eq!(removed, 4);
        let remaining: Vec<String> = store.all().into_iter().map(|n| n.path).collect();
        assert_eq!(remaining, ["src", "src/a.rs"]);
    }

    #[test]
    fn test_prune_keeps_everything_under_unreadable_dirs() {
        let store = NodeStore::new();
        for p in ["src/a.rs", "src/locked/deep/b.rs", "src/locked/c.rs", "src/gone.rs"] {
            store.upsert(Node::content_node(p, p, vec![1.0])).unwrap();
        }
        let keep: HashSet<String> = ["src/a.rs".to_string()].into_iter().collect();

        let removed = store.prune_under("", &keep, &["src/locked".to_string()]);
        assert_eq!(removed, 1);
        assert!(store.get("src/gone.rs").is_none());
        assert!(store.get("src/locked/deep/b.rs").is_some());
        assert!(store.get("src/locked/c.rs").is_some());

        // An unreadable walk root means nothing under it can be judged stale.
        assert_eq!(store.prune_under("", &HashSet::new(), &[String::new()]), 0);
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn test_replace_all_fills_in_ancestors() {
        let store = NodeStore::new();
        store.upsert(Node::path_node("stale")).unwrap();

        let mut nodes = BTreeMap::new();
        nodes.insert(
            "a/b.rs".to_string(),
            Node::content_node("a/b.rs", "b", vec![0.5, 0.5, 0.5]),
        );
        store.replace_all(nodes);

        assert!(store.get("stale").is_none());
        assert!(store.get("a").is_some());
        assert_eq!(store.dimensions(), Some(3));
    }

    #[test]
    fn test_concurrent_writers_converge() {
        let store = Arc::new(NodeStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let path = format!("dir{}/file{j}.rs", i % 2);
                        #[allow(clippy::cast_precision_loss)]
                        let node = Node::content_node(path, format!("{i}-{j}"), vec![i as f32, 1.0]);
                        store.upsert(node).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 2 directories x 50 files plus the 2 directory nodes.
        assert_eq!(store.len(), 102);
        for node in store.all().into_iter().filter(Node::is_content) {
            let (i, _) = node.content.split_once('-').unwrap();
            #[allow(clippy::cast_precision_loss)]
            let expected = i.parse::<usize>().unwrap() as f32;
            assert!((node.embedding[0] - expected).abs() < f32::EPSILON);
        }
    }
}
