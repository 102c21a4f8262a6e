//! Filter resolution, intersection and sorting.

use crate::error::CoreResult;
use crate::index::{Index, PrefixIndex, RangeIndex};
use crate::store::RecordStore;
use crate::types::Offset;
use cinedex_codec::Record;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Year filter: one year or an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    /// Exactly this year.
    Exact(i32),
    /// Every year in `min..=max`.
    Range {
        /// Lowest matching year.
        min: i32,
        /// Highest matching year.
        max: i32,
    },
}

impl YearFilter {
    /// Returns the inclusive bounds.
    #[must_use]
    pub fn bounds(self) -> (i32, i32) {
        match self {
            Self::Exact(year) => (year, year),
            Self::Range { min, max } => (min, max),
        }
    }
}

/// Field results are sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Title, ignoring case.
    #[default]
    Title,
    /// Release year.
    Year,
    /// Director, ignoring case.
    Director,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "year" => Ok(Self::Year),
            "director" => Ok(Self::Director),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Title => "title",
            Self::Year => "year",
            Self::Director => "director",
        })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// A set of optional filters plus result ordering.
///
/// Every present filter must match. An `id` filter short-circuits the
/// others. String filters that are empty or only whitespace count as
/// absent, and a query with no filter at all matches nothing.
///
/// ```rust
/// use cinedex_core::{Query, SortKey};
///
/// let query = Query::new()
///     .title_prefix("hamlet")
///     .year_range(1900, 1920)
///     .sort_by(SortKey::Year)
///     .descending();
/// assert!(query.has_filters());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Exact record id.
    pub id: Option<String>,
    /// Release year or year range.
    pub year: Option<YearFilter>,
    /// Case-insensitive title prefix.
    pub title_prefix: Option<String>,
    /// Exact, case-sensitive director name.
    pub director: Option<String>,
    /// Case-insensitive genre tag.
    pub genre: Option<String>,
    /// Sort field.
    pub sort: SortKey,
    /// Sort direction.
    pub order: SortOrder,
    /// Maximum number of records returned, applied after sorting.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a query with no filters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by exact id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Filters by one year.
    #[must_use]
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(YearFilter::Exact(year));
        self
    }

    /// Filters by an inclusive year range.
    #[must_use]
    pub fn year_range(mut self, min: i32, max: i32) -> Self {
        self.year = Some(YearFilter::Range { min, max });
        self
    }

    /// Filters by title prefix.
    #[must_use]
    pub fn title_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.title_prefix = Some(prefix.into());
        self
    }

    /// Filters by director.
    #[must_use]
    pub fn director(mut self, director: impl Into<String>) -> Self {
        self.director = Some(director.into());
        self
    }

    /// Filters by genre tag.
    #[must_use]
    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// Sets the sort field.
    #[must_use]
    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort = key;
        self
    }

    /// Sets the sort direction.
    #[must_use]
    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Sorts largest first.
    #[must_use]
    pub fn descending(self) -> Self {
        self.order(SortOrder::Descending)
    }

    /// Caps the number of returned records.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if at least one filter is present.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        present(&self.id).is_some()
            || self.year.is_some()
            || present(&self.title_prefix).is_some()
            || present(&self.director).is_some()
            || present(&self.genre).is_some()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Resolves queries against the index traits and the record store.
///
/// The engine borrows everything it reads and holds no state of its own.
pub struct QueryEngine<'a> {
    ids: &'a dyn RangeIndex<String>,
    years: &'a dyn RangeIndex<i32>,
    directors: &'a dyn Index<String>,
    titles: &'a dyn PrefixIndex,
    store: &'a RecordStore,
}

impl<'a> QueryEngine<'a> {
    /// Creates an engine over the given indexes and store.
    pub fn new(
        ids: &'a dyn RangeIndex<String>,
        years: &'a dyn RangeIndex<i32>,
        directors: &'a dyn Index<String>,
        titles: &'a dyn PrefixIndex,
        store: &'a RecordStore,
    ) -> Self {
        Self {
            ids,
            years,
            directors,
            titles,
            store,
        }
    }

    /// Runs `query` and returns the matching records, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn execute(&self, query: &Query) -> CoreResult<Vec<Record>> {
        let mut records = match present(&query.id) {
            Some(id) => self.by_id(id)?,
            None => {
                let offsets = self.resolve(query)?;
                self.materialize(&offsets)?
            }
        };

        sort_records(&mut records, query.sort, query.order);
        if let Some(limit) = query.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// The most recently appended record with this id.
    fn by_id(&self, id: &str) -> CoreResult<Vec<Record>> {
        let latest = self.ids.lookup(&id.to_string()).into_iter().max();
        debug!(id, ?latest, "resolved id filter");
        match latest {
            Some(offset) => self.materialize(&[offset]),
            None => Ok(Vec::new()),
        }
    }

    /// Intersects the offset sets of every present filter, ascending.
    fn resolve(&self, query: &Query) -> CoreResult<Vec<Offset>> {
        let mut sets: Vec<HashSet<Offset>> = Vec::new();

        if let Some(prefix) = present(&query.title_prefix) {
            let found = self.titles.prefix_lookup(prefix);
            debug!(prefix, hits = found.len(), "resolved title filter");
            sets.push(found.into_iter().collect());
        }
        if let Some(director) = present(&query.director) {
            let found = self.directors.lookup(&director.to_string());
            debug!(director, hits = found.len(), "resolved director filter");
            sets.push(found.into_iter().collect());
        }
        if let Some(year) = query.year {
            let (min, max) = year.bounds();
            let found = self.years.range_lookup(&min, &max);
            debug!(min, max, hits = found.len(), "resolved year filter");
            sets.push(found.into_iter().collect());
        }
        if let Some(genre) = present(&query.genre) {
            // The scan cannot widen an intersection that is already empty.
            if sets.iter().any(HashSet::is_empty) {
                sets.push(HashSet::new());
            } else {
                let found = self.scan_genre(genre)?;
                debug!(genre, hits = found.len(), "resolved genre filter");
                sets.push(found);
            }
        }

        let Some(smallest) = (0..sets.len()).min_by_key(|&i| sets[i].len()) else {
            return Ok(Vec::new());
        };
        let base = sets.swap_remove(smallest);
        let mut offsets: Vec<Offset> = base
            .into_iter()
            .filter(|offset| sets.iter().all(|set| set.contains(offset)))
            .collect();
        offsets.sort_unstable();
        Ok(offsets)
    }

    fn scan_genre(&self, genre: &str) -> CoreResult<HashSet<Offset>> {
        let mut found = HashSet::new();
        for item in self.store.scan()? {
            let (offset, record) = item?;
            if record.has_genre(genre) {
                found.insert(offset);
            }
        }
        Ok(found)
    }

    fn materialize(&self, offsets: &[Offset]) -> CoreResult<Vec<Record>> {
        let mut records = Vec::with_capacity(offsets.len());
        for &offset in offsets {
            match self.store.read_at(offset)? {
                Some(record) => records.push(record),
                None => warn!(%offset, "index entry does not resolve to a record"),
            }
        }
        Ok(records)
    }
}

/// Stable sort; equal keys keep their current relative order.
fn sort_records(records: &mut [Record], key: SortKey, order: SortOrder) {
    records.sort_by(|a, b| {
        let ord = compare(a, b, key);
        match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });
}

fn compare(a: &Record, b: &Record, key: SortKey) -> Ordering {
    match key {
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortKey::Year => a.year.cmp(&b.year),
        SortKey::Director => a.director.to_lowercase().cmp(&b.director.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{BTreeIndex, HashIndex, PrefixTrie};

    struct Fixture {
        ids: BTreeIndex<String>,
        years: BTreeIndex<i32>,
        directors: HashIndex<String>,
        titles: PrefixTrie,
        store: RecordStore,
    }

    impl Fixture {
        fn new(records: &[Record]) -> Self {
            let mut fixture = Self {
                ids: BTreeIndex::new(2).unwrap(),
                years: BTreeIndex::new(2).unwrap(),
                directors: HashIndex::new(),
                titles: PrefixTrie::new(),
                store: RecordStore::in_memory(),
            };
            for record in records {
                fixture.add(record);
            }
            fixture
        }

        fn add(&mut self, record: &Record) {
            let offset = self.store.append(record).unwrap();
            self.ids.insert(record.id.clone(), offset);
            self.years.insert(record.year, offset);
            self.directors.insert(record.director.clone(), offset);
            self.titles.insert(record.title.clone(), offset);
        }

        fn run(&self, query: &Query) -> Vec<String> {
            let engine = QueryEngine::new(
                &self.ids,
                &self.years,
                &self.directors,
                &self.titles,
                &self.store,
            );
            engine
                .execute(query)
                .unwrap()
                .into_iter()
                .map(|r| r.id)
                .collect()
        }
    }

    fn catalog() -> Fixture {
        Fixture::new(&[
            Record::new("tt1", "Hamlet", 1910, "Drama", "A Director"),
            Record::new("tt2", "Hamlet Returns", 1912, "Drama,Horror", "B Director"),
            Record::new("tt3", "Othello", 1910, "Drama", "A Director"),
        ])
    }

    #[test]
    fn title_prefix_filter() {
        assert_eq!(catalog().run(&Query::new().title_prefix("Hamlet")), ["tt1", "tt2"]);
    }

    #[test]
    fn year_filter() {
        assert_eq!(catalog().run(&Query::new().year(1910)), ["tt1", "tt3"]);
    }

    #[test]
    fn filters_intersect() {
        let query = Query::new().title_prefix("Hamlet").year(1910);
        assert_eq!(catalog().run(&query), ["tt1"]);
    }

    #[test]
    fn id_ignores_other_filters() {
        let query = Query::new().id("tt3").title_prefix("Hamlet").year(1912);
        assert_eq!(catalog().run(&query), ["tt3"]);
    }

    #[test]
    fn id_returns_latest_duplicate() {
        let mut fixture = catalog();
        fixture.add(&Record::new("tt1", "Hamlet (restored)", 1910, "Drama", "A Director"));

        let engine = QueryEngine::new(
            &fixture.ids,
            &fixture.years,
            &fixture.directors,
            &fixture.titles,
            &fixture.store,
        );
        let found = engine.execute(&Query::new().id("tt1")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Hamlet (restored)");
    }

    #[test]
    fn unknown_id_is_empty() {
        assert!(catalog().run(&Query::new().id("tt404")).is_empty());
    }

    #[test]
    fn no_filter_is_empty() {
        assert!(catalog().run(&Query::new()).is_empty());
        assert!(catalog().run(&Query::new().title_prefix("   ").director("")).is_empty());
        assert!(!Query::new().genre(" ").has_filters());
    }

    #[test]
    fn blank_id_counts_as_absent() {
        let query = Query::new().id("  ").year(1912);
        assert_eq!(catalog().run(&query), ["tt2"]);
    }

    #[test]
    fn director_is_exact() {
        assert_eq!(catalog().run(&Query::new().director("A Director")), ["tt1", "tt3"]);
        assert!(catalog().run(&Query::new().director("a director")).is_empty());
    }

    #[test]
    fn genre_matches_tags_case_insensitively() {
        assert_eq!(catalog().run(&Query::new().genre("horror")), ["tt2"]);
        assert!(catalog().run(&Query::new().genre("Dram")).is_empty());
        let query = Query::new().genre("DRAMA").year(1910);
        assert_eq!(catalog().run(&query), ["tt1", "tt3"]);
    }

    #[test]
    fn year_range_filter() {
        let fixture = catalog();
        assert_eq!(fixture.run(&Query::new().year_range(1911, 1920)), ["tt2"]);
        assert!(fixture.run(&Query::new().year_range(1920, 1900)).is_empty());
    }

    #[test]
    fn sort_by_year_descending() {
        let query = Query::new()
            .genre("drama")
            .sort_by(SortKey::Year)
            .descending();
        assert_eq!(catalog().run(&query), ["tt2", "tt1", "tt3"]);
    }

    #[test]
    fn sort_ignores_case_and_keeps_ties_stable() {
        let fixture = Fixture::new(&[
            Record::new("a", "zeta", 2000, "Drama", "D"),
            Record::new("b", "Alpha", 2000, "Drama", "D"),
            Record::new("c", "alpha", 2000, "Drama", "D"),
        ]);
        assert_eq!(fixture.run(&Query::new().year(2000)), ["b", "c", "a"]);
        assert_eq!(fixture.run(&Query::new().year(2000).descending()), ["a", "b", "c"]);
    }

    #[test]
    fn limit_applies_after_sort() {
        let query = Query::new().year_range(1900, 2000).sort_by(SortKey::Year).limit(2);
        assert_eq!(catalog().run(&query), ["tt1", "tt3"]);
    }

    #[test]
    fn stale_offsets_are_skipped() {
        let mut fixture = catalog();
        fixture.years.insert(1910, Offset::from_index(99));
        assert_eq!(fixture.run(&Query::new().year(1910)), ["tt1", "tt3"]);
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!("Year".parse::<SortKey>(), Ok(SortKey::Year));
        assert!("rating".parse::<SortKey>().is_err());
        assert_eq!(SortKey::Director.to_string(), "director");
    }
}
