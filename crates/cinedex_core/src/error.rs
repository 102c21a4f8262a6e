//! Error types for cinedex core.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in cinedex core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] cinedex_storage::StorageError),

    /// Record codec error.
    #[error("codec error: {0}")]
    Codec(#[from] cinedex_codec::CodecError),

    /// I/O error outside the record store (index files, import files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Bytes do not follow the expected format.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// An index violates one of its structural invariants.
    #[error("index corruption: {message}")]
    IndexCorruption {
        /// Description of the violated invariant.
        message: String,
    },

    /// Checksum mismatch on a persisted index payload.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Checksum stored in the header.
        expected: u32,
        /// Checksum of the payload as read.
        actual: u32,
    },

    /// The record store length is not a whole number of records.
    #[error("record store holds {size} bytes, not a multiple of the record size")]
    MisalignedStore {
        /// Store size in bytes.
        size: u64,
    },

    /// Persisted indexes cannot be used; rebuild them from the store.
    #[error("index rebuild required ({path}): {reason}")]
    RebuildRequired {
        /// Index file that could not be used.
        path: PathBuf,
        /// Why it could not be used.
        reason: String,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an index corruption error.
    pub fn index_corruption(message: impl Into<String>) -> Self {
        Self::IndexCorruption {
            message: message.into(),
        }
    }

    /// Creates a rebuild-required error for the given index file.
    pub fn rebuild_required(path: &Path, reason: impl ToString) -> Self {
        Self::RebuildRequired {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if the caller should rebuild indexes from the store.
    #[must_use]
    pub fn needs_rebuild(&self) -> bool {
        matches!(self, Self::RebuildRequired { .. })
    }
}
