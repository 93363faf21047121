//! Version command.

use serde::Serialize;

use crate::error::Result;
use crate::graph::FORMAT_VERSION;

#[derive(Serialize)]
struct VersionOutput {
    version: &'static str,
    index_format: u32,
    build: &'static str,
}

/// Print the crate version and the index format it writes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let output = VersionOutput {
        version: env!("CARGO_PKG_VERSION"),
        index_format: FORMAT_VERSION,
        build: if cfg!(debug_assertions) { "dev" } else { "release" },
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "craft version {} (index format v{}, {})",
            output.version, output.index_format, output.build
        );
    }
    Ok(())
}
