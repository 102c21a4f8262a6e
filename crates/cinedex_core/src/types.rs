//! Core type definitions.

use cinedex_codec::RECORD_SIZE;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte position of a record in the record store.
///
/// Offsets are always `record_index * RECORD_SIZE` and never change once
/// issued, so they double as stable record identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Offset(pub u64);

impl Offset {
    /// Creates an offset from a raw byte position.
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Returns the offset of the record at position `index` in the store.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(index as u64 * RECORD_SIZE as u64)
    }

    /// Returns the raw byte position.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the record's position in the store.
    #[must_use]
    pub const fn record_index(self) -> u64 {
        self.0 / RECORD_SIZE as u64
    }

    /// Returns true if the offset falls on a record boundary.
    #[must_use]
    pub const fn is_aligned(self) -> bool {
        self.0 % RECORD_SIZE as u64 == 0
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
