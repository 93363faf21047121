//! Node path normalisation and hierarchy derivation.
//!
//! Node paths are `/`-separated and relative to the index root, with no
//! empty, `.` or `..` segments. Hierarchy is never stored as pointers; it
//! is derived from the path string on demand.

use std::path::Path;

use crate::error::{Error, Result};

fn invalid(path: &str, reason: &str) -> Error {
    Error::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Normalise a relative path into node-key form.
///
/// # Errors
///
/// Returns `Error::InvalidPath` for empty paths, absolute paths, and paths
/// whose `..` segments climb out of the root.
pub fn normalize(raw: &str) -> Result<String> {
    let unified = raw.replace('\\', "/");
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(invalid(raw, "absolute path outside the index root"));
    }
    if unified.contains('\0') {
        return Err(invalid(raw, "contains a NUL byte"));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(invalid(raw, "escapes the index root"));
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(invalid(raw, "empty path"));
    }
    Ok(segments.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Normalise `path` relative to `root`. `path` may be absolute (under
/// `root`) or already relative.
///
/// # Errors
///
/// Returns `Error::InvalidPath` when an absolute path is not under `root`
/// or is not valid UTF-8.
pub fn relative_to(root: &Path, path: &Path) -> Result<String> {
    let display = path.display().to_string();
    let relative = if path.is_absolute() {
        path.strip_prefix(root)
            .map_err(|_| invalid(&display, "absolute path outside the index root"))?
    } else {
        path
    };
    let relative = relative
        .to_str()
        .ok_or_else(|| invalid(&display, "path is not valid UTF-8"))?;
    normalize(relative)
}

/// Ancestor directory paths, outermost first: `a/b/c.rs` yields `a`, `a/b`.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(i, _)| &path[..i])
}

/// Immediate parent, or `None` for a top-level path.
#[must_use]
pub fn parent(path: &str) -> Option<&str> {
    path.rfind('/').map(|i| &path[..i])
}

/// Last path segment.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rfind('/').map_or(path, |i| &path[i + 1..])
}

/// Whether `path` equals `dir` or lies beneath it. An empty `dir` is the root.
#[must_use]
pub fn is_within(path: &str, dir: &str) -> bool {
    dir.is_empty()
        || path == dir
        || (path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("src/main.rs").unwrap(), "src/main.rs");
        assert_eq!(normalize("./src//lib.rs").unwrap(), "src/lib.rs");
        assert_eq!(normalize("src\\graph\\mod.rs").unwrap(), "src/graph/mod.rs");
        assert_eq!(normalize("src/../README.md").unwrap(), "README.md");
        assert_eq!(normalize("a/./b/").unwrap(), "a/b");
    }

    #[test]
    fn test_normalize_rejects() {
        for bad in ["", ".", "./", "../x", "a/../../x", "/etc/passwd", "C:/x"] {
            assert!(
                matches!(normalize(bad), Err(Error::InvalidPath { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_relative_to_root() {
        let root = Path::new("/work/repo");
        assert_eq!(
            relative_to(root, Path::new("/work/repo/src/lib.rs")).unwrap(),
            "src/lib.rs"
        );
        assert_eq!(relative_to(root, Path::new("src/lib.rs")).unwrap(), "src/lib.rs");
        assert!(relative_to(root, Path::new("/elsewhere/lib.rs")).is_err());
    }

    #[test]
    fn test_hierarchy_helpers() {
        let got: Vec<&str> = ancestors("a/b/c.rs").collect();
        assert_eq!(got, ["a", "a/b"]);
        assert_eq!(ancestors("top.rs").count(), 0);
        assert_eq!(parent("a/b/c.rs"), Some("a/b"));
        assert_eq!(parent("top.rs"), None);
        assert_eq!(file_name("a/b/c.rs"), "c.rs");

        assert!(is_within("src/a.rs", "src"));
        assert!(is_within("src", "src"));
        assert!(!is_within("srcx/a.rs", "src"));
        assert!(is_within("anything", ""));
    }
}
