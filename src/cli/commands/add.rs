//! Add command implementation.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use super::{absolute, load_if_present, open_graph, resolve_root, runtime};
use crate::config::resolve_index_path;
use crate::error::Result;
use crate::graph::{path, AddOutcome, FileContent};

#[derive(Serialize)]
struct AddOutput {
    path: String,
    outcome: AddOutcome,
    nodes: usize,
}

/// Index a single file and save the index.
///
/// Binary and oversized files are stored as path nodes.
///
/// # Errors
///
/// Returns an error if the file cannot be read, lies outside the project
/// root, cannot be embedded, or the index cannot be saved.
pub fn execute(file: &Path, index: Option<&PathBuf>, json: bool) -> Result<()> {
    let root = resolve_root()?;
    let index_path = resolve_index_path(index);
    let graph = open_graph(&root, &index_path, None)?;
    load_if_present(&graph, &index_path)?;

    let file = std::fs::canonicalize(absolute(file))?;
    let node_path = path::relative_to(&root, &file)?;
    let text = match graph.exclusion().classify(std::fs::read(&file)?) {
        FileContent::Text(text) => text,
        FileContent::Binary | FileContent::TooLarge => String::new(),
    };

    let rt = runtime()?;
    let outcome = rt.block_on(graph.add_file(&node_path, &text))?;
    graph.save(&index_path)?;

    if json {
        let output = AddOutput {
            path: node_path,
            outcome,
            nodes: graph.len(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if !crate::is_quiet() {
        let label = match outcome {
            AddOutcome::Added => "Embedded".green(),
            AddOutcome::PathNode => "Path node".cyan(),
            AddOutcome::Unchanged => "Unchanged".dimmed(),
        };
        println!("{label} {node_path}");
    }
    Ok(())
}
