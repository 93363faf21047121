//! Index command implementation.

use std::path::PathBuf;
use std::time::Duration;

use colored::Colorize;

use super::{load_if_present, open_graph, resolve_root, runtime};
use crate::cancel::CancelToken;
use crate::cli::IndexArgs;
use crate::config::default_index_path;
use crate::error::{Error, Result};
use crate::graph::{IndexOptions, IndexReport};

/// Execute the index command.
///
/// Loads the prior index (unless `--rebuild`), walks the tree, saves, and
/// prints the report. A `ROOT` inside the project refreshes only that
/// subtree of the project index; nodes stay keyed from the project root. A timed-out run still saves what it indexed and then
/// exits with the cancellation code.
///
/// # Errors
///
/// Returns an error if the provider is not configured, the prior index is
/// corrupt or from another model, the provider rejects the credential, or
/// the index cannot be written.
pub fn execute(args: &IndexArgs, index: Option<&PathBuf>, json: bool) -> Result<()> {
    let project = resolve_root()?;
    let walk_root = match &args.root {
        Some(explicit) => std::fs::canonicalize(explicit)?,
        None => project.clone(),
    };
    let graph_root = if walk_root.starts_with(&project) {
        project
    } else {
        walk_root.clone()
    };
    let index_path = index.cloned().unwrap_or_else(|| default_index_path(&graph_root));
    let graph = open_graph(&graph_root, &index_path, args.concurrency.map(usize::from))?;

    if !args.rebuild {
        load_if_present(&graph, &index_path)?;
    }

    let options = IndexOptions {
        prune: args.prune,
        concurrency: None,
    };
    let cancel = CancelToken::from_timeout(args.timeout.map(Duration::from_secs));

    let rt = runtime()?;
    let report = rt.block_on(graph.index_tree(&walk_root, &options, &cancel))?;
    graph.save(&index_path)?;

    if json {
        let output = serde_json::json!({
            "index": index_path.display().to_string(),
            "root": walk_root.display().to_string(),
            "nodes": graph.len(),
            "report": report,
        });
        println!("{output}");
    } else if !crate::is_quiet() {
        print_report(&report, graph.len(), &index_path);
    }

    if report.cancelled {
        return Err(Error::Cancelled);
    }
    Ok(())
}

fn print_report(report: &IndexReport, total: usize, index_path: &std::path::Path) {
    println!(
        "{} {} files in {:.1}s",
        "Indexed".green().bold(),
        report.scanned,
        Duration::from_millis(report.elapsed_ms).as_secs_f64()
    );
    println!("  Embedded:   {}", report.added);
    println!("  Unchanged:  {}", report.unchanged);
    println!("  Path nodes: {}", report.path_nodes);
    if report.pruned > 0 {
        println!("  Pruned:     {}", report.pruned);
    }
    if !report.failed.is_empty() {
        println!("  {}     {}", "Failed:".red(), report.failed.len());
        for failure in &report.failed {
            println!("    {} {}", failure.path.yellow(), failure.error.dimmed());
        }
    }
    if report.cancelled {
        println!("{}", "Stopped early; partial results were saved.".yellow());
    }
    println!("{total} nodes saved to {}", index_path.display());
}
