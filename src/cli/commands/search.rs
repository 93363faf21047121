//! Search command implementation.

use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use super::{open_graph, resolve_root, runtime};
use crate::cancel::CancelToken;
use crate::cli::SearchArgs;
use crate::config::resolve_index_path;
use crate::error::Result;
use crate::graph::{NodeKind, SearchResult};

/// Characters of content shown per result.
const PREVIEW_CHARS: usize = 100;

#[derive(Serialize)]
struct SearchHit<'a> {
    rank: usize,
    path: &'a str,
    similarity: f32,
    kind: NodeKind,
    preview: String,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    top_k: usize,
    results: Vec<SearchHit<'a>>,
}

/// Rank indexed content against the query.
///
/// # Errors
///
/// Returns an error if there is no index (`craft index` first), `-k` is 0,
/// the query cannot be embedded, or the timeout expires.
pub fn execute(args: &SearchArgs, index: Option<&PathBuf>, json: bool) -> Result<()> {
    let root = resolve_root()?;
    let index_path = resolve_index_path(index);
    let graph = open_graph(&root, &index_path, None)?;
    graph.load(&index_path)?;

    let query = args.query.join(" ");
    let cancel = CancelToken::from_timeout(args.timeout.map(Duration::from_secs));
    let rt = runtime()?;
    let results = rt.block_on(graph.search_with_cancel(&query, args.top_k, &cancel))?;

    if json {
        let output = SearchOutput {
            query: &query,
            top_k: args.top_k,
            results: hits(&results),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No indexed content to search. Run `craft index` first.");
        return Ok(());
    }
    for hit in hits(&results) {
        println!(
            "{}. {} {}",
            hit.rank,
            format!("{:.3}", hit.similarity).cyan(),
            hit.path.bold()
        );
        println!("   {}", hit.preview.dimmed());
    }
    Ok(())
}

fn hits(results: &[SearchResult]) -> Vec<SearchHit<'_>> {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| SearchHit {
            rank: i + 1,
            path: &r.node.path,
            similarity: r.similarity,
            kind: r.node.kind(),
            preview: r.node.preview(PREVIEW_CHARS),
        })
        .collect()
}
