//! Rebuild command implementation.

use crate::error::CliResult;
use cinedex_core::{Config, IndexManager};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Runs the rebuild command.
///
/// Ignores any persisted index and rebuilds from the record store.
pub fn run(dir: &Path) -> CliResult<()> {
    info!(path = %dir.display(), "rebuilding indexes");
    let started = Instant::now();
    let mut catalog = IndexManager::open(Config::in_dir(dir))?;
    catalog.rebuild_from_store()?;
    catalog.persist()?;

    let summary = catalog.index_summary()?;
    println!(
        "Rebuilt indexes over {} record(s) in {:.2?}",
        summary.records,
        started.elapsed()
    );
    Ok(())
}
