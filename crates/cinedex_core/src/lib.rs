//! # cinedex core
//!
//! Indexing and retrieval for fixed-width movie records.
//!
//! This crate provides:
//! - [`RecordStore`]: an append-only file of 234-byte records addressed by
//!   byte offset
//! - Three index structures: an arena [`BTreeIndex`] (year, id), a
//!   [`HashIndex`] (director) and a [`PrefixTrie`] (title)
//! - [`QueryEngine`]: filter resolution, set intersection and sorting
//! - [`IndexManager`]: the single owner and writer of all indexes, with
//!   full rebuild, incremental append, persistence and reload
//!
//! ## Example
//!
//! ```no_run
//! use cinedex_core::{Config, IndexManager, Query, Record};
//!
//! let mut manager = IndexManager::open_or_rebuild(Config::in_dir("data"))?;
//! manager.add_record(&Record::new("tt1", "Hamlet", 1910, "Drama", "A Director"))?;
//! manager.persist()?;
//!
//! let hits = manager.query(&Query::new().title_prefix("ham").year(1910))?;
//! # Ok::<(), cinedex_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod import;
pub mod index;
mod manager;
mod query;
mod stats;
mod store;
mod types;

pub use cinedex_codec::{Record, RECORD_SIZE};
pub use config::{Config, DEFAULT_MIN_DEGREE};
pub use error::{CoreError, CoreResult};
pub use import::{ImportSummary, RowError};
pub use index::{
    BTreeIndex, HashIndex, Index, IndexKey, PersistentIndex, PrefixIndex, PrefixTrie, RangeIndex,
};
pub use manager::{IndexManager, IndexSet, IndexSummary, SharedIndexManager};
pub use query::{Query, QueryEngine, SortKey, SortOrder, YearFilter};
pub use stats::CatalogStats;
pub use store::{RecordIter, RecordStore};
pub use types::Offset;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
