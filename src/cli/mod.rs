//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Craft - semantic context graph for your source tree
#[derive(Parser, Debug)]
#[command(name = "craft", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Index file path (default: <project root>/.craft-index.json)
    #[arg(long, global = true, env = "CRAFT_INDEX")]
    pub index: Option<PathBuf>,

    /// Output as JSON (for agent integration)
    #[arg(long, alias = "robot", global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build or refresh the index for a source tree
    Index(IndexArgs),

    /// Index or re-index a single file
    Add {
        /// File to index
        file: PathBuf,
    },

    /// Rank indexed files by similarity to a query
    Search(SearchArgs),

    /// Show index statistics (no provider needed)
    Status,

    /// List the children of a directory in the index
    Tree {
        /// Directory path inside the index (default: top level)
        path: Option<String>,
    },

    /// Embedding provider management
    Embeddings {
        #[command(subcommand)]
        command: EmbeddingsCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Root of the tree to index (default: git toplevel or current directory)
    pub root: Option<PathBuf>,

    /// Ignore any existing index and start from scratch
    #[arg(long)]
    pub rebuild: bool,

    /// Remove entries for files that no longer exist
    #[arg(long)]
    pub prune: bool,

    /// In-flight embedding calls (1-8)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=8))]
    pub concurrency: Option<u16>,

    /// Stop after this many seconds, keeping what was indexed
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query text
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Number of results
    #[arg(short = 'k', long = "top-k", default_value_t = 3)]
    pub top_k: usize,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

// ============================================================================
// Embeddings Commands
// ============================================================================

#[derive(Subcommand, Debug, Clone)]
pub enum EmbeddingsCommands {
    /// Show provider configuration and availability
    Status,

    /// Configure the embedding provider (saved to ~/.craft/config.json)
    Configure {
        /// Provider (gemini, ollama, huggingface)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use (provider-specific)
        #[arg(short, long)]
        model: Option<String>,

        /// API endpoint (for custom servers)
        #[arg(long)]
        endpoint: Option<String>,

        /// Gemini API key
        #[arg(long)]
        api_key: Option<String>,

        /// HuggingFace token
        #[arg(long)]
        token: Option<String>,

        /// Embed oversized files chunk by chunk and average, instead of truncating
        #[arg(long)]
        chunk_average: Option<bool>,

        /// Remove all saved embedding settings
        #[arg(long, conflicts_with_all = ["provider", "model", "endpoint", "api_key", "token", "chunk_average"])]
        reset: bool,
    },

    /// Test embedding provider connectivity
    Test {
        /// Text to generate test embedding for
        #[arg(default_value = "Hello world")]
        text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::parse_from(["craft", "search", "where", "is", "retry", "-k", "5"]);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.query.join(" "), "where is retry");
        assert_eq!(args.top_k, 5);
    }

    #[test]
    fn test_concurrency_is_bounded() {
        assert!(Cli::try_parse_from(["craft", "index", "--concurrency", "9"]).is_err());
        assert!(Cli::try_parse_from(["craft", "index", "--concurrency", "8"]).is_ok());
    }
}
