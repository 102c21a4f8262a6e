//! Cross-crate integration helpers.
//!
//! [`CatalogModel`] is a brute-force stand-in for the indexed catalog: it
//! keeps the records in a plain vector and answers every query by linear
//! scan, so index-backed results can be checked against it.

use cinedex_core::{Offset, Query, Record, SortKey, SortOrder, YearFilter};
use cinedex_storage::StorageBackend;
use std::cmp::Ordering;

/// Linear-scan model of a catalog.
#[derive(Debug, Default, Clone)]
pub struct CatalogModel {
    records: Vec<Record>,
}

impl CatalogModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record as the store would keep it.
    pub fn add(&mut self, record: &Record) -> Offset {
        self.records.push(record.truncated());
        Offset::from_index(self.records.len() - 1)
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the model holds no record.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Answers `query` by scanning every record.
    pub fn query(&self, query: &Query) -> Vec<Record> {
        let mut found: Vec<Record> = match present(&query.id) {
            Some(id) => self
                .records
                .iter()
                .rev()
                .find(|r| r.id == id)
                .cloned()
                .into_iter()
                .collect(),
            None if !query.has_filters() => Vec::new(),
            None => self
                .records
                .iter()
                .filter(|r| matches(r, query))
                .cloned()
                .collect(),
        };

        found.sort_by(|a, b| {
            let ord = compare(a, b, query.sort);
            match query.order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        found
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn matches(record: &Record, query: &Query) -> bool {
    if let Some(prefix) = present(&query.title_prefix) {
        if !record.title.to_lowercase().starts_with(&prefix.to_lowercase()) {
            return false;
        }
    }
    if let Some(director) = present(&query.director) {
        if record.director != director {
            return false;
        }
    }
    if let Some(year) = query.year {
        let (min, max) = match year {
            YearFilter::Exact(y) => (y, y),
            YearFilter::Range { min, max } => (min, max),
        };
        if record.year < min || record.year > max {
            return false;
        }
    }
    if let Some(genre) = present(&query.genre) {
        let wanted = genre.trim().to_lowercase();
        if !record
            .genre
            .split(',')
            .any(|tag| tag.trim().to_lowercase() == wanted)
        {
            return false;
        }
    }
    true
}

fn compare(a: &Record, b: &Record, key: SortKey) -> Ordering {
    match key {
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortKey::Year => a.year.cmp(&b.year),
        SortKey::Director => a.director.to_lowercase().cmp(&b.director.to_lowercase()),
    }
}

/// Returns the ids of `records`, in order.
pub fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

/// Storage backend integration checks.
pub mod storage {
    use super::*;

    /// Checks that appended bytes read back and that truncation rolls back.
    pub fn check_append_and_truncate(backend: &mut dyn StorageBackend, data: &[u8]) {
        let before = backend.size().expect("Failed to read size");
        let offset = backend.append(data).expect("Failed to append");
        backend.flush().expect("Failed to flush");
        assert_eq!(offset, before, "Append should land at the previous end");

        let retrieved = backend.read_at(offset, data.len()).expect("Failed to read");
        assert_eq!(data, &retrieved[..], "Retrieved data should match");

        backend.truncate(before).expect("Failed to truncate");
        assert_eq!(backend.size().expect("Failed to read size"), before);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_records, TestCatalog};
    use cinedex_storage::{FileBackend, InMemoryBackend};

    #[test]
    fn model_answers_the_scenario() {
        let mut model = CatalogModel::new();
        for record in sample_records() {
            model.add(&record);
        }
        assert_eq!(ids(&model.query(&Query::new().title_prefix("Hamlet"))), ["tt1", "tt2"]);
        assert_eq!(ids(&model.query(&Query::new().year(1910))), ["tt1", "tt3"]);
        assert!(model.query(&Query::new()).is_empty());
    }

    #[test]
    fn model_agrees_with_catalog_on_samples() {
        let catalog = TestCatalog::with_records(&sample_records());
        let mut model = CatalogModel::new();
        for record in sample_records() {
            model.add(&record);
        }

        let query = Query::new().genre("drama").year_range(1900, 1930);
        assert_eq!(
            ids(&catalog.query(&query).unwrap()),
            ids(&model.query(&query))
        );
    }

    #[test]
    fn backends_append_and_truncate() {
        let mut memory = InMemoryBackend::new();
        storage::check_append_and_truncate(&mut memory, b"record bytes");

        let dir = tempfile::tempdir().unwrap();
        let mut file = FileBackend::open_with_create_dirs(&dir.path().join("store.bin")).unwrap();
        storage::check_append_and_truncate(&mut file, b"record bytes");
    }
}
