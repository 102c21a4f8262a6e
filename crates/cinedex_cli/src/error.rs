//! CLI error type.

use cinedex_core::CoreError;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Catalog operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// JSON rendering failed.
    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The year range is empty.
    #[error("--year-from {from} is after --year-to {to}")]
    InvertedYearRange {
        /// Lower bound given.
        from: i32,
        /// Upper bound given.
        to: i32,
    },

    /// The import file does not exist.
    #[error("import file not found: {0}")]
    MissingImportFile(String),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
