//! Catalog configuration.

use crate::error::{CoreError, CoreResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default B-tree minimum degree.
pub const DEFAULT_MIN_DEGREE: usize = 3;

/// File names used by [`Config::in_dir`].
const STORE_FILE: &str = "records.bin";
const TITLE_INDEX_FILE: &str = "title.trie";
const DIRECTOR_INDEX_FILE: &str = "director.hash";
const YEAR_INDEX_FILE: &str = "year.btree";
const ID_INDEX_FILE: &str = "id.btree";

/// Paths and tuning for an [`IndexManager`](crate::IndexManager).
///
/// Every path is explicit; nothing is resolved from process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The append-only record store.
    pub store_path: PathBuf,

    /// Persisted title trie.
    pub title_index_path: PathBuf,

    /// Persisted director hash index.
    pub director_index_path: PathBuf,

    /// Persisted year B-tree.
    pub year_index_path: PathBuf,

    /// Persisted id B-tree.
    pub id_index_path: PathBuf,

    /// Minimum degree `t` of both B-trees; must be at least 2.
    pub min_degree: usize,

    /// Whether to fsync the store after every append.
    pub sync_on_append: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::in_dir("data")
    }
}

impl Config {
    /// Creates a configuration with every file inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            store_path: dir.join(STORE_FILE),
            title_index_path: dir.join(TITLE_INDEX_FILE),
            director_index_path: dir.join(DIRECTOR_INDEX_FILE),
            year_index_path: dir.join(YEAR_INDEX_FILE),
            id_index_path: dir.join(ID_INDEX_FILE),
            min_degree: DEFAULT_MIN_DEGREE,
            sync_on_append: false,
        }
    }

    /// Sets the record store path.
    #[must_use]
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Sets the B-tree minimum degree.
    #[must_use]
    pub fn min_degree(mut self, t: usize) -> Self {
        self.min_degree = t;
        self
    }

    /// Sets whether to fsync the store after every append.
    #[must_use]
    pub fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Returns the four index file paths.
    #[must_use]
    pub fn index_paths(&self) -> [&Path; 4] {
        [
            &self.title_index_path,
            &self.director_index_path,
            &self.year_index_path,
            &self.id_index_path,
        ]
    }

    /// Checks that the configuration can be used.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the minimum degree is below 2
    /// or two files share a path.
    pub fn validate(&self) -> CoreResult<()> {
        if self.min_degree < 2 {
            return Err(CoreError::invalid_config(format!(
                "minimum degree must be at least 2, got {}",
                self.min_degree
            )));
        }

        let mut seen = HashSet::new();
        for path in std::iter::once(self.store_path.as_path()).chain(self.index_paths()) {
            if !seen.insert(path) {
                return Err(CoreError::invalid_config(format!(
                    "{} is used for more than one file",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}
