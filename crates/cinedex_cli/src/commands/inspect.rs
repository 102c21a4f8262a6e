//! Inspect command implementation.

use super::{open_catalog, OutputFormat};
use crate::error::CliResult;
use cinedex_core::{IndexSummary, RECORD_SIZE};
use serde::Serialize;
use std::path::Path;

/// Catalog inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Catalog directory.
    pub path: String,
    /// Record store size in bytes.
    pub store_size: u64,
    /// Bytes per record.
    pub record_size: usize,
    /// Index shapes.
    pub indexes: IndexSummary,
}

/// Runs the inspect command.
pub fn run(dir: &Path, format: OutputFormat) -> CliResult<()> {
    let catalog = open_catalog(dir)?;
    let result = InspectResult {
        path: dir.display().to_string(),
        store_size: catalog.store().size()?,
        record_size: RECORD_SIZE,
        indexes: catalog.index_summary()?,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    let idx = &result.indexes;
    println!("cinedex Catalog Inspection");
    println!("==========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Store:");
    println!("  Size:        {} bytes", result.store_size);
    println!("  Record size: {} bytes", result.record_size);
    println!("  Records:     {}", idx.records);
    println!();
    println!("Title trie:");
    println!("  Entries: {}", idx.title_entries);
    println!("  Nodes:   {}", idx.trie_nodes);
    println!();
    println!("Director hash:");
    println!("  Entries:   {}", idx.director_entries);
    println!("  Directors: {}", idx.distinct_directors);
    println!();
    println!("Year B-tree (t = {}):", idx.min_degree);
    println!("  Entries: {}", idx.year_entries);
    println!("  Height:  {}", idx.year_height);
    println!("  Nodes:   {}", idx.year_nodes);
    if let Some((min, max)) = idx.year_span {
        println!("  Span:    {min}..={max}");
    }
    println!();
    println!("Id B-tree (t = {}):", idx.min_degree);
    println!("  Entries: {}", idx.id_entries);
    println!("  Height:  {}", idx.id_height);
    println!("  Nodes:   {}", idx.id_nodes);
}
