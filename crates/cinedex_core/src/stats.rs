//! Catalog statistics.
//!
//! Aggregates are computed by a single sequential scan of the record store;
//! nothing is cached between calls.

use crate::error::CoreResult;
use crate::store::RecordStore;
use cinedex_codec::Record;
use serde::Serialize;
use std::collections::BTreeMap;

/// Record counts per year, genre tag and director.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    /// Total records scanned.
    pub total: u64,
    /// Records per release year.
    pub by_year: BTreeMap<i32, u64>,
    /// Records per genre tag; a record counts once for each of its tags.
    pub by_genre: BTreeMap<String, u64>,
    /// Records per director. Blank directors are not counted.
    pub by_director: BTreeMap<String, u64>,
}

impl CatalogStats {
    /// Creates empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `store` and counts every complete record.
    ///
    /// # Errors
    ///
    /// Returns the first read or decode error of the scan.
    pub fn collect(store: &RecordStore) -> CoreResult<Self> {
        let mut stats = Self::new();
        for item in store.scan()? {
            let (_, record) = item?;
            stats.record(&record);
        }
        Ok(stats)
    }

    /// Adds one record to the counts.
    pub fn record(&mut self, record: &Record) {
        self.total += 1;
        *self.by_year.entry(record.year).or_default() += 1;
        for tag in record.genres() {
            *self.by_genre.entry(tag.to_string()).or_default() += 1;
        }
        let director = record.director.trim();
        if !director.is_empty() {
            *self.by_director.entry(director.to_string()).or_default() += 1;
        }
    }

    /// The `n` years with the most records.
    #[must_use]
    pub fn top_years(&self, n: usize) -> Vec<(i32, u64)> {
        top(&self.by_year, n)
    }

    /// The `n` most common genre tags.
    #[must_use]
    pub fn top_genres(&self, n: usize) -> Vec<(String, u64)> {
        top(&self.by_genre, n)
    }

    /// The `n` directors with the most records.
    #[must_use]
    pub fn top_directors(&self, n: usize) -> Vec<(String, u64)> {
        top(&self.by_director, n)
    }

    /// The year with the most records, lowest year on a tie.
    #[must_use]
    pub fn busiest_year(&self) -> Option<(i32, u64)> {
        self.top_years(1).into_iter().next()
    }
}

/// Orders by count descending, then key ascending.
fn top<K: Ord + Clone>(counts: &BTreeMap<K, u64>, n: usize) -> Vec<(K, u64)> {
    let mut ranked: Vec<(K, u64)> = counts.iter().map(|(k, c)| (k.clone(), *c)).collect();
    // Stable sort over the map's ascending keys keeps ties in key order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}
