//! Stats command implementation.

use super::{open_catalog, OutputFormat};
use crate::error::CliResult;
use cinedex_core::CatalogStats;
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

/// Statistics report.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    /// Total records.
    pub total: u64,
    /// Years with the most records.
    pub top_years: Vec<(i32, u64)>,
    /// Most common genre tags.
    pub top_genres: Vec<(String, u64)>,
    /// Directors with the most records.
    pub top_directors: Vec<(String, u64)>,
}

impl StatsReport {
    /// Ranks the first `top` entries of each dimension.
    pub fn from_stats(stats: &CatalogStats, top: usize) -> Self {
        Self {
            total: stats.total,
            top_years: stats.top_years(top),
            top_genres: stats.top_genres(top),
            top_directors: stats.top_directors(top),
        }
    }
}

/// Runs the stats command.
pub fn run(dir: &Path, top: usize, format: OutputFormat) -> CliResult<()> {
    let catalog = open_catalog(dir)?;
    let report = StatsReport::from_stats(&catalog.stats()?, top);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text_output(&report),
    }
    Ok(())
}

fn print_text_output(report: &StatsReport) {
    println!("Catalog Statistics");
    println!("==================");
    println!();
    println!("Total records: {}", report.total);
    print_ranking("Top years", &report.top_years);
    print_ranking("Top genres", &report.top_genres);
    print_ranking("Top directors", &report.top_directors);
}

fn print_ranking<K: Display>(title: &str, entries: &[(K, u64)]) {
    println!();
    println!("{title}:");
    if entries.is_empty() {
        println!("  (none)");
    }
    for (key, count) in entries {
        println!("  {key:<40} {count:>8}");
    }
}
