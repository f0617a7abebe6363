//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "smartlease")]
#[command(
    author,
    version,
    about = "Hybrid semantic and keyword search over rental listings"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Config file (defaults to $SMARTLEASE_CONFIG, then the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a listings CSV and embed new or changed rows
    Ingest(IngestArgs),

    /// Add a single listing
    Add(AddArgs),

    /// Search listings with a free-text query
    Search(SearchArgs),

    /// Show store status
    Status,

    /// Start the HTTP server
    Serve,
}

#[derive(Args)]
pub struct IngestArgs {
    /// Listings CSV file
    pub path: PathBuf,

    /// Summaries per embedding request
    #[arg(long, default_value_t = smartlease_core::ingest::DEFAULT_EMBED_BATCH_SIZE)]
    pub batch_size: usize,

    /// Load rows without calling the embedding service
    #[arg(long)]
    pub no_embed: bool,

    /// Re-embed every row, not only new or changed ones
    #[arg(short, long, conflicts_with = "no_embed")]
    pub force: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Listing fields as column=value pairs (property_id is required)
    #[arg(required = true, value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Stop after retrieval and print the merged candidates
    #[arg(long)]
    pub no_rerank: bool,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Cli,
    Json,
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected column=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing column name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
