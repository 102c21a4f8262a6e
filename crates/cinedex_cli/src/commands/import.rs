//! Import command implementation.

use super::open_catalog;
use crate::error::{CliError, CliResult};
use cinedex_core::ImportSummary;
use std::path::Path;

/// Runs the import command.
pub fn run(dir: &Path, file: &Path) -> CliResult<()> {
    if !file.exists() {
        return Err(CliError::MissingImportFile(file.display().to_string()));
    }

    let mut catalog = open_catalog(dir)?;
    let summary = catalog.import_tsv(file)?;
    catalog.sync()?;
    catalog.persist()?;

    println!("{}", summary_line(&summary));
    Ok(())
}

fn summary_line(summary: &ImportSummary) -> String {
    format!(
        "Read {} row(s): imported {} record(s), skipped {} malformed row(s)",
        summary.rows(),
        summary.added,
        summary.skipped
    )
}
