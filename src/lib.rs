//! Craft - semantic context graph for a coding assistant
//!
//! This crate provides the core functionality for the `craft` CLI tool:
//! files are embedded through a hosted or local provider, kept in a
//! path-keyed graph, persisted as one JSON file, and ranked by cosine
//! similarity against a query.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`graph`] - Node store, indexer, search, and persistence
//! - [`embeddings`] - Embedding providers (Gemini, Ollama, HuggingFace) and the retrying client
//! - [`cancel`] - Cancellation and deadlines for long-running work
//! - [`config`] - Project root, index location, and exclusion settings
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod graph;

pub use error::{Error, Result};

/// Global quiet flag for `--quiet`.
///
/// When set, commands skip their human-readable summaries. Errors are
/// still reported.
pub static QUIET: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if quiet mode is active.
#[inline]
pub fn is_quiet() -> bool {
    QUIET.load(std::sync::atomic::Ordering::Relaxed)
}
