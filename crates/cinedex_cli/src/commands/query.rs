//! Query command implementation.

use super::{open_catalog, OutputFormat, QueryArgs};
use crate::error::CliResult;
use cinedex_core::Record;
use std::path::Path;

/// Runs the query command.
pub fn run(dir: &Path, args: &QueryArgs) -> CliResult<()> {
    let query = args.to_query()?;
    if !query.has_filters() {
        println!("No filter given; pass at least one of --id, --year, --title, --director, --genre");
        return Ok(());
    }

    let catalog = open_catalog(dir)?;
    let records = catalog.query(&query)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => print_text_output(&records),
    }
    Ok(())
}

fn print_text_output(records: &[Record]) {
    if records.is_empty() {
        println!("No matching records");
        return;
    }
    for record in records {
        println!("{record}");
    }
    println!();
    println!("{} record(s)", records.len());
}
