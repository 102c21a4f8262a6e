//! Test fixtures and catalog helpers.
//!
//! Provides convenience functions for setting up temporary catalogs
//! and common test scenarios.

use cinedex_core::{Config, IndexManager, Record};
use std::path::Path;
use tempfile::TempDir;

/// Minimum degree used by fixtures; small so trees split early.
pub const TEST_MIN_DEGREE: usize = 2;

/// A catalog in a temporary directory with automatic cleanup.
pub struct TestCatalog {
    /// The catalog.
    pub manager: IndexManager,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::with_min_degree(TEST_MIN_DEGREE)
    }

    /// Creates an empty catalog whose trees use minimum degree `t`.
    pub fn with_min_degree(t: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let manager = IndexManager::open(Self::config_for(temp_dir.path(), t))
            .expect("Failed to open catalog");
        Self { manager, temp_dir }
    }

    /// Creates a catalog and adds `records` one by one.
    pub fn with_records(records: &[Record]) -> Self {
        let mut catalog = Self::new();
        for record in records {
            catalog
                .manager
                .add_record(record)
                .expect("Failed to add record");
        }
        catalog
    }

    /// Returns the catalog directory.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Returns a configuration pointing at this catalog's files.
    pub fn config(&self) -> Config {
        Self::config_for(self.dir(), self.manager.config().min_degree)
    }

    /// Opens a second manager over the same files, with empty indexes.
    pub fn open_again(&self) -> IndexManager {
        IndexManager::open(self.config()).expect("Failed to reopen catalog")
    }

    fn config_for(dir: &Path, t: usize) -> Config {
        Config::in_dir(dir).min_degree(t)
    }
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestCatalog {
    type Target = IndexManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

impl std::ops::DerefMut for TestCatalog {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.manager
    }
}

/// Runs a test with a temporary catalog.
pub fn with_temp_catalog<F, R>(f: F) -> R
where
    F: FnOnce(&mut IndexManager) -> R,
{
    let mut catalog = TestCatalog::new();
    f(&mut catalog.manager)
}

/// A small hand-written catalog.
///
/// The first three rows are the classic Hamlet/Othello scenario.
pub fn sample_records() -> Vec<Record> {
    vec![
        Record::new("tt1", "Hamlet", 1910, "Drama", "A Director"),
        Record::new("tt2", "Hamlet Returns", 1912, "Drama", "B Director"),
        Record::new("tt3", "Othello", 1910, "Drama", "A Director"),
        Record::new("tt4", "Nosferatu", 1922, "Fantasy,Horror", "F. W. Murnau"),
        Record::new("tt5", "Metropolis", 1927, "Drama, Sci-Fi", "Fritz Lang"),
        Record::new("tt6", "M", 1931, "Crime,Mystery,Thriller", "Fritz Lang"),
        Record::new("tt7", "Sunrise", 1927, "Drama,Romance", "F. W. Murnau"),
    ]
}

/// Renders records as tab-separated import rows.
pub fn to_tsv(records: &[Record]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "{}\t{}\t{}\t{}\t{}\n",
                r.id, r.title, r.year, r.genre, r.director
            )
        })
        .collect()
}
