//! cinedex CLI
//!
//! Command-line front end for a cinedex movie catalog.
//!
//! # Commands
//!
//! - `import` - Append rows from a tab-separated file
//! - `query` - Search by id, year, title prefix, director or genre
//! - `rebuild` - Rebuild every index from the record store
//! - `stats` - Aggregate counts per year, genre and director
//! - `inspect` - Describe the store and index structures

mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::{OutputFormat, QueryArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default catalog directory.
const DEFAULT_DATA_DIR: &str = "data";

/// Movie catalog indexing and search.
#[derive(Parser)]
#[command(name = "cinedex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the catalog directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append records from a tab-separated file and persist the indexes
    Import {
        /// File with one `id, title, year, genre, director` row per line
        file: PathBuf,
    },

    /// Search the catalog
    Query(QueryArgs),

    /// Rebuild every index from the record store
    Rebuild,

    /// Show catalog statistics
    Stats {
        /// Entries shown per ranking
        #[arg(short, long, default_value = "5")]
        top: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Describe the record store and indexes
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let path = cli.path.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    match cli.command {
        Commands::Import { file } => commands::import::run(&path, &file)?,
        Commands::Query(args) => commands::query::run(&path, &args)?,
        Commands::Rebuild => commands::rebuild::run(&path)?,
        Commands::Stats { top, format } => commands::stats::run(&path, top, format)?,
        Commands::Inspect { format } => commands::inspect::run(&path, format)?,
        Commands::Version => {
            println!("cinedex CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("cinedex core v{}", cinedex_core::VERSION);
        }
    }

    Ok(())
}
