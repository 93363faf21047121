//! Command implementations.

pub mod add;
pub mod completions;
pub mod embeddings;
pub mod index;
pub mod search;
pub mod status;
pub mod tree;
pub mod version;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{project_root, resolve_exclusion_policy};
use crate::embeddings::config::{load_config, process_env, resolve_embedding_config};
use crate::embeddings::factory::create_embedding_client;
use crate::error::{Error, Result};
use crate::graph::{path, ContextGraph, LoadOutcome};

/// Create the tokio runtime command handlers block on.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Build a graph rooted at `root` from `~/.craft/config.json` and the
/// environment. Fails fast on a missing provider credential.
///
/// `concurrency` overrides the configured in-flight limit.
pub(crate) fn open_graph(root: &Path, index: &Path, concurrency: Option<usize>) -> Result<ContextGraph> {
    let config = load_config()?;
    let mut resolved = resolve_embedding_config(&config, process_env)?;
    if let Some(n) = concurrency {
        resolved.max_concurrency = n;
    }
    let client = create_embedding_client(&resolved)?;

    let mut policy = resolve_exclusion_policy(&config)?;
    if let Ok(index_rel) = path::relative_to(root, &absolute(index)) {
        policy = policy.skip_file(index_rel);
    }

    Ok(ContextGraph::new(client)
        .with_root(root)
        .with_exclusion(policy))
}

/// Load the prior index, treating a missing file as an empty graph.
pub(crate) fn load_if_present(graph: &ContextGraph, index: &Path) -> Result<Option<LoadOutcome>> {
    match graph.load(index) {
        Ok(outcome) => Ok(Some(outcome)),
        Err(e) if e.is_no_prior_index() => {
            info!(path = %index.display(), "No prior index, starting empty");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Project root, canonicalised so walked paths and `--index` line up.
pub(crate) fn resolve_root() -> Result<PathBuf> {
    Ok(std::fs::canonicalize(project_root())?)
}

/// Make `path` absolute against the current directory, without touching the
/// filesystem beyond that.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
