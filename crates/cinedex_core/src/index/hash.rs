//! Hash index implementation.

use crate::error::{CoreError, CoreResult};
use crate::index::traits::{Index, IndexKey};
use crate::types::Offset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Director name to record offsets.
///
/// Each key keeps the offsets of its records in append order. Names match
/// exactly, case included; "Fritz Lang" and "fritz lang" are two keys.
///
/// # Example
///
/// ```rust
/// use cinedex_core::{HashIndex, Index, Offset};
///
/// let mut directors: HashIndex<String> = HashIndex::new();
/// directors.insert("Akira Kurosawa".to_string(), Offset::new(0));
///
/// assert_eq!(directors.lookup(&"Akira Kurosawa".to_string()), vec![Offset::new(0)]);
/// assert!(directors.lookup(&"akira kurosawa".to_string()).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct HashIndex<K: IndexKey> {
    /// Key to offsets mapping.
    entries: HashMap<K, Vec<Offset>>,
    /// Total entry count.
    count: usize,
}

impl<K: IndexKey> Default for HashIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: IndexKey> HashIndex<K> {
    /// Creates an empty hash index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            count: 0,
        }
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index holds `key`.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates keys with their offset lists, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[Offset])> {
        self.entries.iter().map(|(key, offsets)| (key, offsets.as_slice()))
    }

    /// Checks that the cached entry count matches the stored lists.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexCorruption`] on a mismatch or an empty list.
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(key) = self.entries.iter().find_map(|(k, v)| v.is_empty().then_some(k)) {
            return Err(CoreError::index_corruption(format!(
                "key {key:?} has no offsets"
            )));
        }
        let stored: usize = self.entries.values().map(Vec::len).sum();
        if stored != self.count {
            return Err(CoreError::index_corruption(format!(
                "hash index holds {stored} entries but records {}",
                self.count
            )));
        }
        Ok(())
    }
}

impl<K: IndexKey> Index<K> for HashIndex<K> {
    fn insert(&mut self, key: K, offset: Offset) {
        self.entries.entry(key).or_default().push(offset);
        self.count += 1;
    }

    fn lookup(&self, key: &K) -> Vec<Offset> {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.count
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.count = 0;
    }
}

/// Persisted form: entries sorted by key so equal indexes write equal bytes.
#[derive(Serialize, Deserialize)]
#[serde(bound = "K: IndexKey")]
struct HashSnapshot<K> {
    count: usize,
    entries: Vec<(K, Vec<Offset>)>,
}

impl<K: IndexKey> Serialize for HashIndex<K> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(K, Vec<Offset>)> = self
            .entries
            .iter()
            .map(|(key, offsets)| (key.clone(), offsets.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        HashSnapshot {
            count: self.count,
            entries,
        }
        .serialize(serializer)
    }
}

impl<'de, K: IndexKey> Deserialize<'de> for HashIndex<K> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let snapshot = HashSnapshot::<K>::deserialize(deserializer)?;
        let mut entries = HashMap::with_capacity(snapshot.entries.len());
        for (key, offsets) in snapshot.entries {
            if entries.insert(key, offsets).is_some() {
                return Err(serde::de::Error::custom("duplicate key in hash index"));
            }
        }
        Ok(Self {
            entries,
            count: snapshot.count,
        })
    }
}
