//! Index file persistence.
//!
//! The index is one JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "provider": "gemini",
//!   "model": "text-embedding-004",
//!   "dimensions": 768,
//!   "saved_at": "2025-01-01T00:00:00Z",
//!   "nodes": { "src/main.rs": { "path": "src/main.rs", "content": "...", "embedding": [...] } }
//! }
//! ```
//!
//! Unversioned files whose top level is the path-keyed node map are still
//! read. Writes go to a uniquely named temp file beside the target, are
//! fsynced, then renamed over it, so a crash never leaves a torn index.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::node::Node;
use super::path;
use crate::error::{Error, Result};

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata describing which embedding space the nodes live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub provider: String,
    pub model: String,
    pub dimensions: Option<usize>,
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    version: u32,
    #[serde(flatten)]
    meta: &'a IndexMeta,
    saved_at: DateTime<Utc>,
    nodes: &'a BTreeMap<String, Node>,
}

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    provider: String,
    model: String,
    #[serde(default)]
    dimensions: Option<usize>,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    nodes: BTreeMap<String, Node>,
}

/// A validated index read from disk.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    /// `None` for the unversioned layout.
    pub version: Option<u32>,
    /// `None` for the unversioned layout.
    pub meta: Option<IndexMeta>,
    pub saved_at: Option<DateTime<Utc>>,
    pub nodes: BTreeMap<String, Node>,
}

impl LoadedIndex {
    /// Embedding length shared by the content nodes, if there are any.
    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.nodes
            .values()
            .find(|n| n.is_content())
            .map(|n| n.embedding.len())
    }

    #[must_use]
    pub fn content_len(&self) -> usize {
        self.nodes.values().filter(|n| n.is_content()).count()
    }
}

fn format_error(path: &Path, message: impl Into<String>) -> Error {
    Error::Format {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Read and validate the index at `path`.
///
/// # Errors
///
/// - `Error::NoPriorIndex` if the file does not exist
/// - `Error::Format` if it is not a valid index
/// - `Error::Io` for any other read failure
pub fn read_index(path: &Path) -> Result<LoadedIndex> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::NoPriorIndex {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    parse_index(path, &bytes)
}

/// Parse and validate index bytes. `path` is only used for error messages.
///
/// # Errors
///
/// Returns `Error::Format` for invalid JSON, an unknown version, or nodes
/// that break the graph invariants.
pub fn parse_index(path: &Path, bytes: &[u8]) -> Result<LoadedIndex> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| format_error(path, e.to_string()))?;

    let serde_json::Value::Object(top) = &value else {
        return Err(format_error(path, "top level is not a JSON object"));
    };

    let loaded = match top.get("version") {
        Some(serde_json::Value::Number(version)) => {
            if version.as_u64() != Some(u64::from(FORMAT_VERSION)) {
                return Err(format_error(path, format!("unsupported format version {version}")));
            }
            let file: IndexFile =
                serde_json::from_value(value).map_err(|e| format_error(path, e.to_string()))?;
            LoadedIndex {
                version: Some(file.version),
                meta: Some(IndexMeta {
                    provider: file.provider,
                    model: file.model,
                    dimensions: file.dimensions,
                }),
                saved_at: file.saved_at,
                nodes: file.nodes,
            }
        }
        _ => {
            let nodes: BTreeMap<String, Node> =
                serde_json::from_value(value).map_err(|e| format_error(path, e.to_string()))?;
            debug!(path = %path.display(), "Read unversioned index");
            LoadedIndex {
                version: None,
                meta: None,
                saved_at: None,
                nodes,
            }
        }
    };

    validate(path, &loaded)?;
    Ok(loaded)
}

fn validate(path: &Path, index: &LoadedIndex) -> Result<()> {
    let mut dimensions: Option<usize> = None;

    for (key, node) in &index.nodes {
        if *key != node.path {
            return Err(format_error(
                path,
                format!("key '{key}' does not match node path '{}'", node.path),
            ));
        }
        match path::normalize(key) {
            Ok(normalized) if normalized == *key => {}
            _ => return Err(format_error(path, format!("invalid node path '{key}'"))),
        }
        if !node.is_content() {
            continue;
        }
        if node.content.is_empty() {
            return Err(format_error(path, format!("node '{key}' has an embedding but no content")));
        }
        let len = node.embedding.len();
        match dimensions {
            Some(expected) if expected != len => {
                return Err(format_error(
                    path,
                    format!("node '{key}' has {len} dimensions, expected {expected}"),
                ));
            }
            Some(_) => {}
            None => dimensions = Some(len),
        }
    }

    if let (Some(declared), Some(actual)) = (
        index.meta.as_ref().and_then(|m| m.dimensions),
        dimensions,
    ) {
        if declared != actual {
            return Err(format_error(
                path,
                format!("header declares {declared} dimensions, nodes have {actual}"),
            ));
        }
    }
    Ok(())
}

/// Serialize `nodes` with `meta` and write them atomically to `path`.
///
/// # Errors
///
/// Returns `Error::Io` or `Error::Json` if the file cannot be written.
pub fn write_index(path: &Path, meta: &IndexMeta, nodes: &BTreeMap<String, Node>) -> Result<()> {
    let document = IndexFileRef {
        version: FORMAT_VERSION,
        meta,
        saved_at: Utc::now(),
        nodes,
    };
    let content = serde_json::to_vec_pretty(&document)?;
    atomic_write(path, &content)?;
    debug!(path = %path.display(), nodes = nodes.len(), "Wrote index");
    Ok(())
}

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a uniquely named temp file in the target's directory
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched and the
/// temp file is removed.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let file_name = path
        .file_name()
        .map_or_else(|| "index".into(), |n| n.to_string_lossy().into_owned());
    let temp_path = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

    let written = (|| -> std::io::Result<()> {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}
