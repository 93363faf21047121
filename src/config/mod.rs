//! Configuration management.
//!
//! This module resolves where the context index lives and how the indexer
//! treats the tree. Embedding provider settings live in
//! [`crate::embeddings::config`]; both read the same `~/.craft/config.json`.
//!
//! # Index location
//!
//! The index is a single JSON file at the project root. The project root is
//! the git toplevel when inside a repository, else the current directory:
//!
//! ```text
//! <project root>/.craft-index.json
//! ```

use std::path::{Path, PathBuf};

use crate::embeddings::types::CraftConfig;
use crate::graph::ExclusionPolicy;
use crate::error::Result;

/// File name of the persisted index.
pub const INDEX_FILE_NAME: &str = ".craft-index.json";

/// Files larger than this become path nodes instead of being embedded.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Get the git repository root directory.
fn git_toplevel() -> Option<PathBuf> {
    std::process::Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| PathBuf::from(String::from_utf8_lossy(&o.stdout).trim().to_string()))
        .filter(|p| !p.as_os_str().is_empty())
}

/// Resolve the project root: git toplevel, else the current directory.
#[must_use]
pub fn project_root() -> PathBuf {
    git_toplevel()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve the index file path.
///
/// Priority:
/// 1. `explicit` (the `--index` flag, which also reads `CRAFT_INDEX`)
/// 2. `<project root>/.craft-index.json`
#[must_use]
pub fn resolve_index_path(explicit: Option<&PathBuf>) -> PathBuf {
    explicit.cloned().unwrap_or_else(|| default_index_path(&project_root()))
}

/// Index path for a given project root.
#[must_use]
pub fn default_index_path(root: &Path) -> PathBuf {
    root.join(INDEX_FILE_NAME)
}

/// Build the exclusion policy from config-file indexing settings.
///
/// # Errors
///
/// Returns `Error::Config` if a configured glob pattern is invalid.
pub fn resolve_exclusion_policy(config: &CraftConfig) -> Result<ExclusionPolicy> {
    let indexing = config.indexing.clone().unwrap_or_default();
    ExclusionPolicy::new(
        &indexing.exclude,
        indexing.max_file_bytes.unwrap_or(DEFAULT_MAX_FILE_BYTES),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::types::IndexingSettings;
    use crate::error::Error;

    #[test]
    fn test_explicit_index_path_wins() {
        let explicit = PathBuf::from("/tmp/elsewhere.json");
        assert_eq!(resolve_index_path(Some(&explicit)), explicit);
    }

    #[test]
    fn test_default_index_path() {
        assert_eq!(
            default_index_path(Path::new("/work/repo")),
            PathBuf::from("/work/repo/.craft-index.json")
        );
        assert!(resolve_index_path(None).ends_with(INDEX_FILE_NAME));
    }

    #[test]
    fn test_exclusion_policy_from_config() {
        let config = CraftConfig {
            indexing: Some(IndexingSettings {
                exclude: vec!["**/*.lock".into()],
                max_file_bytes: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        };
        let policy = resolve_exclusion_policy(&config).unwrap();
        assert!(policy.is_excluded("Cargo.lock"));
        assert_eq!(policy.max_file_bytes(), 10);
    }

    #[test]
    fn test_bad_glob_is_config_error() {
        let config = CraftConfig {
            indexing: Some(IndexingSettings {
                exclude: vec!["a[".into()],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            resolve_exclusion_policy(&config),
            Err(Error::Config(_))
        ));
    }
}
