//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes than one full record were supplied.
    #[error("record buffer too short: expected {expected} bytes, got {actual}")]
    BufferTooShort {
        /// Bytes required.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },

    /// A text field does not hold valid UTF-8.
    #[error("invalid UTF-8 in field `{field}`")]
    InvalidUtf8 {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The encoder produced a buffer of the wrong width.
    #[error("encoded record has {actual} bytes, layout requires {expected}")]
    LayoutMismatch {
        /// Bytes required by the layout.
        expected: usize,
        /// Bytes produced.
        actual: usize,
    },
}
