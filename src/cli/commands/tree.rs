//! Tree command implementation.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::config::resolve_index_path;
use crate::error::Result;
use crate::graph::{path, read_index, NodeKind, NodeStore};

#[derive(Serialize)]
struct Entry {
    path: String,
    name: String,
    kind: NodeKind,
    children: usize,
}

/// List the direct children of a directory in the index.
///
/// # Errors
///
/// Returns an error if there is no readable index or `dir` is not a valid path.
pub fn execute(dir: Option<&str>, index: Option<&PathBuf>, json: bool) -> Result<()> {
    let index_path = resolve_index_path(index);
    let store = NodeStore::new();
    store.replace_all(read_index(&index_path)?.nodes);

    let dir = match dir.map(str::trim) {
        None | Some("" | "." | "./") => String::new(),
        Some(raw) => path::normalize(raw)?,
    };

    let entries: Vec<Entry> = store
        .children(&dir)
        .into_iter()
        .map(|node| Entry {
            children: store.children(&node.path).len(),
            name: path::file_name(&node.path).to_string(),
            kind: node.kind(),
            path: node.path,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries under '{}'", if dir.is_empty() { "." } else { &dir });
        return Ok(());
    }
    for entry in &entries {
        if entry.children > 0 {
            println!("{}/ ({})", entry.name.blue().bold(), entry.children);
        } else if entry.kind == NodeKind::Content {
            println!("{}", entry.name);
        } else {
            println!("{} {}", entry.name.dimmed(), "[Path Node]".dimmed());
        }
    }
    Ok(())
}
