//! Index traits and key types.

use crate::types::Offset;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// Key type tag written into persisted index headers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// The index is not generic over a key (the title trie).
    None = 0,
    /// 32-bit signed integer keys.
    I32 = 1,
    /// UTF-8 string keys.
    String = 2,
}

impl KeyType {
    /// Decodes a header byte.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::I32),
            2 => Some(Self::String),
            _ => None,
        }
    }
}

/// A key that can be indexed.
///
/// Index keys must be:
/// - Hashable (for `HashIndex`)
/// - Orderable (for `BTreeIndex`)
/// - Serializable through serde (for persistence)
pub trait IndexKey:
    Clone + Eq + Ord + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Tag recorded in persisted index headers.
    const KEY_TYPE: KeyType;
}

impl IndexKey for i32 {
    const KEY_TYPE: KeyType = KeyType::I32;
}

impl IndexKey for String {
    const KEY_TYPE: KeyType = KeyType::String;
}

/// Core index trait: exact-key lookup from key to record offsets.
pub trait Index<K>: Send + Sync {
    /// Inserts a key-offset mapping. Duplicate keys are kept.
    fn insert(&mut self, key: K, offset: Offset);

    /// Returns the offsets stored under `key`, or an empty list.
    fn lookup(&self, key: &K) -> Vec<Offset>;

    /// Returns the number of key-offset entries.
    fn len(&self) -> usize;

    /// Returns true if the index holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry.
    fn clear(&mut self);
}

/// An index over ordered keys that answers inclusive range queries.
pub trait RangeIndex<K>: Index<K> {
    /// Returns the offsets of every key in `min..=max`, in key order.
    ///
    /// Empty when `min > max`.
    fn range_lookup(&self, min: &K, max: &K) -> Vec<Offset>;
}

/// An index over strings that answers prefix queries.
pub trait PrefixIndex: Index<String> {
    /// Returns the offsets of every key starting with `prefix`.
    fn prefix_lookup(&self, prefix: &str) -> Vec<Offset>;
}
