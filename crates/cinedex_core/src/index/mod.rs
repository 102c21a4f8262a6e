//! Index implementations for access paths.
//!
//! Indexes map a field of a record to the store offsets of the records
//! carrying it. They are fully derivable from the record store and are
//! owned and written only by the [`IndexManager`](crate::IndexManager).
//!
//! # Index Types
//!
//! - [`BTreeIndex`]: ordered keys with exact and range lookup (year, id)
//! - [`HashIndex`]: exact equality lookup (director)
//! - [`PrefixTrie`]: case-insensitive title prefixes
//!
//! The query engine only sees the traits: [`Index`], [`RangeIndex`] and
//! [`PrefixIndex`].

mod btree;
mod hash;
pub mod persistence;
mod traits;
mod trie;

pub use btree::{BTreeIndex, Iter};
pub use hash::HashIndex;
pub use persistence::{IndexHeader, IndexKind, PersistentIndex};
pub use traits::{Index, IndexKey, KeyType, PrefixIndex, RangeIndex};
pub use trie::PrefixTrie;
