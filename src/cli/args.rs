//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const QUICK_START: &str = "\
Quick Start:
  $ kbi init                                 # Create .kbindex/settings.toml
  $ kbi sync                                 # Embed new or changed chunks
  $ kbi search \"phd funding\" --country Netherlands
  $ kbi compact                              # Drop rows for deleted sources";

/// Knowledge-base index
#[derive(Parser)]
#[command(
    name = "kbi",
    version = env!("CARGO_PKG_VERSION"),
    about = "Incremental similarity index over a tagged knowledge base",
    long_about = "Keep a persistent vector index in step with a directory of knowledge-base \
                  text and query it with country and category filters.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = QUICK_START
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true, env = "KBI_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .kbindex directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    #[command(about = "Display active settings")]
    Config,

    /// Embed and append corpus chunks not yet in the index
    #[command(about = "Bring the index up to date with the corpus")]
    Sync {
        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Similarity search with optional tag filters
    #[command(about = "Search the knowledge base")]
    Search {
        /// Query text
        query: String,

        /// Maximum number of results (defaults to search.default_limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Only return chunks tagged with this country
        #[arg(long)]
        country: Option<String>,

        /// Only return chunks tagged with this category
        #[arg(long)]
        category: Option<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    #[command(about = "Show row counts and tag breakdown")]
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-read the stored index and check its integrity
    #[command(about = "Check that the vector blob and metadata sidecar belong together")]
    Verify,

    /// Remove rows whose content is no longer in the corpus
    #[command(about = "Drop stale rows without re-embedding")]
    Compact,

    /// Re-embed the whole corpus into a new index
    #[command(about = "Rebuild the index from scratch (also recovers a corrupt index)")]
    Rebuild {
        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },
}
