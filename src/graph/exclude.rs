//! Which paths are worth embedding.
//!
//! Dependency and build directories are skipped outright during a walk.
//! Paths matching a configured glob, and files that are binary or too
//! large, are kept as path nodes so the tree stays navigable.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::DEFAULT_MAX_FILE_BYTES;
use crate::error::{Error, Result};

/// Directory names never descended into.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    ".git",
    "vendor",
    "__pycache__",
    ".venv",
    ".next",
];

/// How a file's bytes should be indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary,
    TooLarge,
}

/// Exclusion rules for one index.
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    globs: GlobSet,
    patterns: Vec<String>,
    skip_files: Vec<String>,
    max_file_bytes: u64,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            globs: GlobSet::empty(),
            patterns: Vec::new(),
            skip_files: Vec::new(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl ExclusionPolicy {
    /// Build a policy from glob patterns matched against node paths.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid glob.
    pub fn new(patterns: &[String], max_file_bytes: u64) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Config(format!("Invalid exclude pattern '{pattern}': {e}")))?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .map_err(|e| Error::Config(format!("Invalid exclude patterns: {e}")))?;

        Ok(Self {
            globs,
            patterns: patterns.to_vec(),
            skip_files: Vec::new(),
            max_file_bytes,
        })
    }

    /// Never index this node path at all (the index file itself).
    #[must_use]
    pub fn skip_file(mut self, node_path: impl Into<String>) -> Self {
        self.skip_files.push(node_path.into());
        self
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    #[must_use]
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    #[must_use]
    pub fn is_excluded_dir_name(name: &str) -> bool {
        DEFAULT_EXCLUDED_DIRS.contains(&name)
    }

    /// Whether the walk should ignore `node_path` entirely.
    #[must_use]
    pub fn is_skipped(&self, node_path: &str) -> bool {
        self.skip_files.iter().any(|f| f == node_path)
    }

    /// Whether `node_path` should be kept as a path node instead of embedded.
    #[must_use]
    pub fn is_excluded(&self, node_path: &str) -> bool {
        node_path.split('/').any(Self::is_excluded_dir_name)
            || self.is_skipped(node_path)
            || self.globs.is_match(node_path)
    }

    /// Decide whether raw file bytes can be embedded.
    #[must_use]
    pub fn classify(&self, bytes: Vec<u8>) -> FileContent {
        if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > self.max_file_bytes {
            return FileContent::TooLarge;
        }
        if bytes.contains(&0) {
            return FileContent::Binary;
        }
        String::from_utf8(bytes).map_or(FileContent::Binary, FileContent::Text)
    }
}
