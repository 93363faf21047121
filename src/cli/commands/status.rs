//! Status command implementation.
//!
//! Reads the index file directly, so it works without a configured
//! embedding provider.

use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use crate::config::resolve_index_path;
use crate::error::Result;
use crate::graph::read_index;

#[derive(Serialize)]
struct StatusOutput {
    index: String,
    version: Option<u32>,
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    saved_at: Option<String>,
    nodes: usize,
    content_nodes: usize,
    path_nodes: usize,
}

/// Show what the index contains.
///
/// # Errors
///
/// Returns `Error::NoPriorIndex` if there is no index and `Error::Format`
/// if it is corrupt.
pub fn execute(index: Option<&PathBuf>, json: bool) -> Result<()> {
    let index_path = resolve_index_path(index);
    let loaded = read_index(&index_path)?;

    let content_nodes = loaded.content_len();
    let output = StatusOutput {
        index: index_path.display().to_string(),
        version: loaded.version,
        provider: loaded.meta.as_ref().map(|m| m.provider.clone()),
        model: loaded.meta.as_ref().map(|m| m.model.clone()),
        dimensions: loaded.dimensions(),
        saved_at: loaded.saved_at.map(|t| t.to_rfc3339()),
        nodes: loaded.nodes.len(),
        content_nodes,
        path_nodes: loaded.nodes.len() - content_nodes,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Context Index".bold());
    println!("  File:       {}", output.index);
    match output.version {
        Some(v) => println!("  Format:     v{v}"),
        None => println!("  Format:     unversioned"),
    }
    if let (Some(provider), Some(model)) = (&output.provider, &output.model) {
        println!("  Model:      {provider}/{model}");
    }
    if let Some(dims) = output.dimensions {
        println!("  Dimensions: {dims}");
    }
    if let Some(saved_at) = &output.saved_at {
        println!("  Saved:      {saved_at}");
    }
    println!(
        "  Nodes:      {} ({} content, {} path)",
        output.nodes, output.content_nodes, output.path_nodes
    );
    Ok(())
}
