//! Index lifecycle: build, incremental append, persistence and reload.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::import::{parse_row_bytes, ImportSummary};
use crate::index::{BTreeIndex, HashIndex, Index, PersistentIndex, PrefixTrie};
use crate::query::{Query, QueryEngine};
use crate::stats::CatalogStats;
use crate::store::RecordStore;
use crate::types::Offset;
use cinedex_codec::Record;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The four indexes kept over the record store.
#[derive(Debug, Clone)]
pub struct IndexSet {
    /// Lower-cased title trie.
    pub titles: PrefixTrie,
    /// Exact director names.
    pub directors: HashIndex<String>,
    /// Release years.
    pub years: BTreeIndex<i32>,
    /// Record ids.
    pub ids: BTreeIndex<String>,
}

impl IndexSet {
    /// Creates four empty indexes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `min_degree < 2`.
    pub fn new(min_degree: usize) -> CoreResult<Self> {
        Ok(Self {
            titles: PrefixTrie::new(),
            directors: HashIndex::new(),
            years: BTreeIndex::new(min_degree)?,
            ids: BTreeIndex::new(min_degree)?,
        })
    }

    /// Inserts one record under `offset` into every index.
    pub fn insert(&mut self, record: &Record, offset: Offset) {
        self.titles.insert(record.title.clone(), offset);
        self.directors.insert(record.director.clone(), offset);
        self.years.insert(record.year, offset);
        self.ids.insert(record.id.clone(), offset);
    }
}

/// Sizes and shapes of the live indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    /// Complete records in the store.
    pub records: u64,
    /// Entries in the title trie.
    pub title_entries: usize,
    /// Nodes in the title trie.
    pub trie_nodes: usize,
    /// Entries in the director index.
    pub director_entries: usize,
    /// Distinct directors.
    pub distinct_directors: usize,
    /// Entries in the year tree.
    pub year_entries: usize,
    /// Levels of the year tree.
    pub year_height: usize,
    /// Nodes of the year tree.
    pub year_nodes: usize,
    /// Lowest and highest indexed year.
    pub year_span: Option<(i32, i32)>,
    /// Entries in the id tree.
    pub id_entries: usize,
    /// Levels of the id tree.
    pub id_height: usize,
    /// Nodes of the id tree.
    pub id_nodes: usize,
    /// Minimum degree of both trees.
    pub min_degree: usize,
}

/// Sole owner and writer of the record store and its indexes.
///
/// Every mutation goes through `&mut self`, so a store append and the
/// matching index inserts are never observed half done. Index inserts
/// cannot fail, and a failed append leaves both the store and the
/// indexes as they were.
#[derive(Debug)]
pub struct IndexManager {
    config: Config,
    store: RecordStore,
    indexes: IndexSet,
}

impl IndexManager {
    /// Opens the store named by `config` with empty indexes.
    ///
    /// A missing store file is an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or an existing
    /// store file cannot be opened.
    pub fn open(config: Config) -> CoreResult<Self> {
        config.validate()?;
        let store =
            RecordStore::open(&config.store_path)?.with_sync_on_append(config.sync_on_append);
        Self::with_store(config, store)
    }

    /// Creates a manager over an already opened store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_store(config: Config, store: RecordStore) -> CoreResult<Self> {
        config.validate()?;
        let indexes = IndexSet::new(config.min_degree)?;
        Ok(Self {
            config,
            store,
            indexes,
        })
    }

    /// Opens the store and loads the persisted indexes, rebuilding and
    /// re-persisting them from the store if they cannot be used.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or read, or the
    /// rebuilt indexes cannot be written.
    pub fn open_or_rebuild(config: Config) -> CoreResult<Self> {
        let mut manager = Self::open(config)?;
        if let Err(err) = manager.load() {
            warn!(%err, "persisted indexes unusable, rebuilding from store");
            manager.rebuild_from_store()?;
            manager.persist()?;
        }
        Ok(manager)
    }

    /// Replaces every index with one built from `records`.
    ///
    /// `records` must be the store contents in store order: record `i` is
    /// indexed at offset `i * RECORD_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured minimum degree is invalid.
    pub fn build_all(&mut self, records: &[Record]) -> CoreResult<()> {
        let mut fresh = IndexSet::new(self.config.min_degree)?;
        for (i, record) in records.iter().enumerate() {
            fresh.insert(&record.truncated(), Offset::from_index(i));
        }
        self.indexes = fresh;
        info!(records = records.len(), "built indexes");
        Ok(())
    }

    /// Rebuilds every index from the current store contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn rebuild_from_store(&mut self) -> CoreResult<()> {
        let records = self.store.read_all()?;
        self.build_all(&records)
    }

    /// Appends `record` to the store and indexes it.
    ///
    /// Indexes see the record exactly as it reads back from the store,
    /// with oversized fields truncated.
    ///
    /// # Errors
    ///
    /// Returns the store error if the append fails; no index is touched.
    pub fn add_record(&mut self, record: &Record) -> CoreResult<Offset> {
        let offset = self.store.append(record)?;
        self.indexes.insert(&record.truncated(), offset);
        debug!(id = %record.id, %offset, "added record");
        Ok(offset)
    }

    /// Imports tab-separated rows, one record per line.
    ///
    /// Malformed rows are logged and counted, never fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or a record cannot be appended.
    /// Rows imported before the failure stay in the catalog.
    pub fn import_batch<R: BufRead>(&mut self, reader: R) -> CoreResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        for (i, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            match parse_row_bytes(&line) {
                Ok(Some(record)) => {
                    self.add_record(&record)?;
                    summary.added += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(line = i + 1, %err, "skipping malformed row");
                    summary.skipped += 1;
                }
            }
        }
        info!(added = summary.added, skipped = summary.skipped, "import finished");
        Ok(summary)
    }

    /// Imports the tab-separated file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the file cannot be opened, or any error
    /// of [`import_batch`](Self::import_batch).
    pub fn import_tsv(&mut self, path: &Path) -> CoreResult<ImportSummary> {
        let file = File::open(path)?;
        info!(path = %path.display(), "importing");
        self.import_batch(BufReader::new(file))
    }

    /// Writes every index to its configured file.
    ///
    /// # Errors
    ///
    /// Returns an error if any index cannot be encoded or written.
    pub fn persist(&self) -> CoreResult<()> {
        let config = &self.config;
        self.indexes.titles.save(&config.title_index_path)?;
        self.indexes.directors.save(&config.director_index_path)?;
        self.indexes.years.save(&config.year_index_path)?;
        self.indexes.ids.save(&config.id_index_path)?;
        info!(entries = self.indexes.ids.len(), "persisted indexes");
        Ok(())
    }

    /// Loads every index from its configured file.
    ///
    /// The loaded indexes replace the current ones only if all four load,
    /// validate, use the configured minimum degree and cover exactly the
    /// records in the store.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RebuildRequired`] naming the first unusable
    /// file, or an error if the store size cannot be read. The current
    /// indexes are left untouched on error.
    pub fn load(&mut self) -> CoreResult<()> {
        let config = &self.config;
        let titles: PrefixTrie = load_index(&config.title_index_path)?;
        let directors: HashIndex<String> = load_index(&config.director_index_path)?;
        let years: BTreeIndex<i32> = load_index(&config.year_index_path)?;
        let ids: BTreeIndex<String> = load_index(&config.id_index_path)?;

        for (path, degree) in [
            (&config.year_index_path, years.min_degree()),
            (&config.id_index_path, ids.min_degree()),
        ] {
            if degree != config.min_degree {
                return Err(CoreError::rebuild_required(
                    path,
                    format!(
                        "tree has minimum degree {degree}, configured {}",
                        config.min_degree
                    ),
                ));
            }
        }

        let records = self.store.len()?;
        for (path, len) in [
            (&config.title_index_path, titles.len()),
            (&config.director_index_path, directors.len()),
            (&config.year_index_path, years.len()),
            (&config.id_index_path, ids.len()),
        ] {
            if len as u64 != records {
                return Err(CoreError::rebuild_required(
                    path,
                    format!("index holds {len} entries, store holds {records} records"),
                ));
            }
        }

        self.indexes = IndexSet {
            titles,
            directors,
            years,
            ids,
        };
        info!(records, "loaded indexes");
        Ok(())
    }

    /// Runs a query against the live indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn query(&self, query: &Query) -> CoreResult<Vec<Record>> {
        self.engine().execute(query)
    }

    /// Returns a query engine borrowing the live indexes.
    #[must_use]
    pub fn engine(&self) -> QueryEngine<'_> {
        QueryEngine::new(
            &self.indexes.ids,
            &self.indexes.years,
            &self.indexes.directors,
            &self.indexes.titles,
            &self.store,
        )
    }

    /// Computes catalog statistics with a full store scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn stats(&self) -> CoreResult<CatalogStats> {
        CatalogStats::collect(&self.store)
    }

    /// Describes the live indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store size cannot be read.
    pub fn index_summary(&self) -> CoreResult<IndexSummary> {
        let idx = &self.indexes;
        Ok(IndexSummary {
            records: self.store.len()?,
            title_entries: idx.titles.len(),
            trie_nodes: idx.titles.node_count(),
            director_entries: idx.directors.len(),
            distinct_directors: idx.directors.key_count(),
            year_entries: idx.years.len(),
            year_height: idx.years.height(),
            year_nodes: idx.years.node_count(),
            year_span: idx.years.min_key().copied().zip(idx.years.max_key().copied()),
            id_entries: idx.ids.len(),
            id_height: idx.ids.height(),
            id_nodes: idx.ids.node_count(),
            min_degree: self.config.min_degree,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the record store.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Returns the live indexes.
    #[must_use]
    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    /// Flushes and syncs the record store.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&mut self) -> CoreResult<()> {
        self.store.flush()?;
        self.store.sync()
    }
}

fn load_index<T: PersistentIndex>(path: &Path) -> CoreResult<T> {
    T::load(path).map_err(|err| CoreError::rebuild_required(path, err))
}

/// An [`IndexManager`] behind a reader/writer lock.
///
/// Queries share the read lock; appends, imports and rebuilds take the
/// write lock, so readers never see a record in the store that is missing
/// from an index.
#[derive(Debug, Clone)]
pub struct SharedIndexManager {
    inner: Arc<RwLock<IndexManager>>,
}

impl SharedIndexManager {
    /// Wraps a manager.
    #[must_use]
    pub fn new(manager: IndexManager) -> Self {
        Self {
            inner: Arc::new(RwLock::new(manager)),
        }
    }

    /// Opens a manager with [`IndexManager::open_or_rebuild`] and wraps it.
    ///
    /// # Errors
    ///
    /// Returns any error of [`IndexManager::open_or_rebuild`].
    pub fn open_or_rebuild(config: Config) -> CoreResult<Self> {
        IndexManager::open_or_rebuild(config).map(Self::new)
    }

    /// Runs a query under the read lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn query(&self, query: &Query) -> CoreResult<Vec<Record>> {
        self.inner.read().query(query)
    }

    /// Appends and indexes a record under the write lock.
    ///
    /// # Errors
    ///
    /// Returns the store error if the append fails.
    pub fn add_record(&self, record: &Record) -> CoreResult<Offset> {
        self.inner.write().add_record(record)
    }

    /// Persists the indexes under the read lock.
    ///
    /// # Errors
    ///
    /// Returns an error if any index cannot be written.
    pub fn persist(&self) -> CoreResult<()> {
        self.inner.read().persist()
    }

    /// Acquires the read lock.
    pub fn read(&self) -> RwLockReadGuard<'_, IndexManager> {
        self.inner.read()
    }

    /// Acquires the write lock.
    pub fn write(&self) -> RwLockWriteGuard<'_, IndexManager> {
        self.inner.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinedex_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::{tempdir, TempDir};

    fn scenario() -> Vec<Record> {
        vec![
            Record::new("tt1", "Hamlet", 1910, "Drama", "A Director"),
            Record::new("tt2", "Hamlet Returns", 1912, "Drama", "B Director"),
            Record::new("tt3", "Othello", 1910, "Drama", "A Director"),
        ]
    }

    fn manager_in(dir: &TempDir) -> IndexManager {
        IndexManager::open(Config::in_dir(dir.path()).min_degree(2)).unwrap()
    }

    fn ids(records: Vec<Record>) -> Vec<String> {
        records.into_iter().map(|r| r.id).collect()
    }

    #[test]
    fn scenario_queries() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        for record in scenario() {
            manager.add_record(&record).unwrap();
        }

        let q = |query: Query| ids(manager.query(&query).unwrap());
        assert_eq!(q(Query::new().title_prefix("Hamlet")), ["tt1", "tt2"]);
        assert_eq!(q(Query::new().year(1910)), ["tt1", "tt3"]);
        assert_eq!(q(Query::new().title_prefix("Hamlet").year(1910)), ["tt1"]);
        assert_eq!(q(Query::new().id("tt3").title_prefix("Hamlet")), ["tt3"]);
    }

    #[test]
    fn offsets_follow_store_order() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        for (i, record) in scenario().iter().enumerate() {
            assert_eq!(manager.add_record(record).unwrap(), Offset::from_index(i));
        }
        assert_eq!(manager.store().len().unwrap(), 3);
    }

    #[test]
    fn incremental_matches_full_build() {
        let dir = tempdir().unwrap();
        let mut records = scenario();
        records.push(Record::new("tt4", "T".repeat(140), 1915, "Comedy", "D".repeat(120)));

        let mut incremental = manager_in(&dir);
        for record in &records {
            incremental.add_record(record).unwrap();
        }

        let mut rebuilt = manager_in(&dir);
        rebuilt.rebuild_from_store().unwrap();

        let (a, b) = (incremental.indexes(), rebuilt.indexes());
        assert_eq!(a.titles.to_bytes().unwrap(), b.titles.to_bytes().unwrap());
        assert_eq!(a.directors.to_bytes().unwrap(), b.directors.to_bytes().unwrap());
        assert_eq!(a.years.to_bytes().unwrap(), b.years.to_bytes().unwrap());
        assert_eq!(a.ids.to_bytes().unwrap(), b.ids.to_bytes().unwrap());
    }

    #[test]
    fn persist_and_load() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        for record in scenario() {
            manager.add_record(&record).unwrap();
        }
        manager.persist().unwrap();

        let mut reopened = manager_in(&dir);
        reopened.load().unwrap();
        assert_eq!(reopened.indexes().ids.len(), 3);
        assert_eq!(ids(reopened.query(&Query::new().year(1910)).unwrap()), ["tt1", "tt3"]);
    }

    #[test]
    fn missing_index_requires_rebuild() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        let err = manager.load().unwrap_err();
        assert!(err.needs_rebuild());
    }

    #[test]
    fn corrupt_index_leaves_live_indexes_untouched() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        for record in scenario() {
            manager.add_record(&record).unwrap();
        }
        manager.persist().unwrap();

        let year_path = manager.config().year_index_path.clone();
        let mut bytes = std::fs::read(&year_path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x55;
        std::fs::write(&year_path, bytes).unwrap();

        match manager.load() {
            Err(CoreError::RebuildRequired { path, .. }) => assert_eq!(path, year_path),
            other => panic!("expected RebuildRequired, got {other:?}"),
        }
        assert_eq!(manager.indexes().years.len(), 3);
    }

    #[test]
    fn stale_index_requires_rebuild() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        manager.add_record(&scenario()[0]).unwrap();
        manager.persist().unwrap();
        manager.add_record(&scenario()[1]).unwrap();

        let mut reopened = manager_in(&dir);
        assert!(reopened.load().unwrap_err().needs_rebuild());
    }

    #[test]
    fn degree_change_requires_rebuild() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        manager.add_record(&scenario()[0]).unwrap();
        manager.persist().unwrap();

        let mut other = IndexManager::open(Config::in_dir(dir.path()).min_degree(5)).unwrap();
        assert!(other.load().unwrap_err().needs_rebuild());
    }

    #[test]
    fn open_or_rebuild_recovers() {
        let dir = tempdir().unwrap();
        {
            let mut manager = manager_in(&dir);
            for record in scenario() {
                manager.add_record(&record).unwrap();
            }
        }

        let config = Config::in_dir(dir.path()).min_degree(2);
        let manager = IndexManager::open_or_rebuild(config.clone()).unwrap();
        assert_eq!(manager.indexes().titles.len(), 3);
        assert!(config.index_paths().iter().all(|p| p.exists()));

        let mut reopened = IndexManager::open(config).unwrap();
        reopened.load().unwrap();
    }

    #[test]
    fn empty_catalog() {
        let dir = tempdir().unwrap();
        let manager = IndexManager::open_or_rebuild(Config::in_dir(dir.path())).unwrap();
        assert!(manager.query(&Query::new().year(1910)).unwrap().is_empty());
        assert_eq!(manager.index_summary().unwrap().records, 0);
    }

    #[test]
    fn import_counts_rows() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        let input = "tt1\tHamlet\t1910\tDrama\tA Director\r\n\
                     \n\
                     tt2\tBroken\tnineteen\tDrama\tX\n\
                     tt3\tShort\t1910\n\
                     tt4\tOthello\t1910\tDrama\tA Director";
        let summary = manager.import_batch(Cursor::new(input)).unwrap();

        assert_eq!(summary, ImportSummary { added: 2, skipped: 2 });
        assert_eq!(summary.rows(), 4);
        assert_eq!(ids(manager.query(&Query::new().director("A Director")).unwrap()), ["tt1", "tt4"]);
    }

    #[test]
    fn import_skips_invalid_utf8() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        let input: &[u8] = b"tt1\t\xff\t1910\tDrama\tX\ntt2\tOk\t1911\tDrama\tY\n";
        let summary = manager.import_batch(input).unwrap();
        assert_eq!(summary, ImportSummary { added: 1, skipped: 1 });
    }

    #[test]
    fn import_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        assert!(matches!(
            manager.import_tsv(&dir.path().join("absent.tsv")),
            Err(CoreError::Io(_))
        ));
    }

    #[test]
    fn summary_and_stats() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(&dir);
        for record in scenario() {
            manager.add_record(&record).unwrap();
        }

        let summary = manager.index_summary().unwrap();
        assert_eq!(summary.records, 3);
        assert_eq!(summary.distinct_directors, 2);
        assert_eq!(summary.year_span, Some((1910, 1912)));
        assert_eq!(summary.min_degree, 2);

        let stats = manager.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_genre["Drama"], 3);
    }

    /// Memory backend whose appends can be made to fail.
    struct FlakyBackend {
        inner: InMemoryBackend,
        fail: Arc<AtomicBool>,
    }

    impl StorageBackend for FlakyBackend {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.inner.read_at(offset, len)
        }

        fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.append(data)
        }

        fn flush(&mut self) -> StorageResult<()> {
            self.inner.flush()
        }

        fn size(&self) -> StorageResult<u64> {
            self.inner.size()
        }

        fn sync(&mut self) -> StorageResult<()> {
            self.inner.sync()
        }

        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            self.inner.truncate(new_size)
        }
    }

    #[test]
    fn failed_append_touches_no_index() {
        let fail = Arc::new(AtomicBool::new(false));
        let store = RecordStore::with_backend(Box::new(FlakyBackend {
            inner: InMemoryBackend::new(),
            fail: Arc::clone(&fail),
        }));
        let mut manager = IndexManager::with_store(Config::in_dir("unused"), store).unwrap();
        manager.add_record(&scenario()[0]).unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            manager.add_record(&scenario()[1]),
            Err(CoreError::Storage(_))
        ));

        assert_eq!(manager.store().len().unwrap(), 1);
        assert_eq!(manager.indexes().ids.len(), 1);
        assert_eq!(manager.indexes().titles.len(), 1);
        assert!(manager.query(&Query::new().id("tt2")).unwrap().is_empty());
    }

    #[test]
    fn shared_manager_serves_concurrent_readers() {
        let dir = tempdir().unwrap();
        let shared = SharedIndexManager::new(manager_in(&dir));
        for record in scenario() {
            shared.add_record(&record).unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.query(&Query::new().year(1910)).unwrap().len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }

        shared.persist().unwrap();
        assert_eq!(shared.read().indexes().years.len(), 3);
    }
}
