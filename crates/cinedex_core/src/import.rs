//! Tab-separated batch import rows.
//!
//! One row per line, exactly five tab-separated fields in record order:
//! `id`, `title`, `year`, `genre`, `director`. Quoting is not supported; a
//! field cannot contain a tab or a newline.

use cinedex_codec::Record;
use serde::Serialize;
use thiserror::Error;

/// Number of tab-separated fields in an import row.
pub const FIELD_COUNT: usize = 5;

/// Why a single import row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// The row does not have exactly five fields.
    #[error("expected {FIELD_COUNT} tab-separated fields, found {found}")]
    FieldCount {
        /// Fields present in the row.
        found: usize,
    },

    /// The year field is not an integer.
    #[error("year {value:?} is not an integer")]
    InvalidYear {
        /// The rejected year text.
        value: String,
    },

    /// The row is not valid UTF-8.
    #[error("row is not valid UTF-8")]
    InvalidUtf8,
}

/// Outcome of a batch import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows appended to the catalog.
    pub added: u64,
    /// Rows rejected as malformed.
    pub skipped: u64,
}

impl ImportSummary {
    /// Total non-blank rows seen.
    #[must_use]
    pub fn rows(&self) -> u64 {
        self.added + self.skipped
    }
}

/// Parses one import row.
///
/// A trailing `\r` or `\n` is stripped. Blank lines yield `Ok(None)`. The
/// year is trimmed before parsing; text fields are taken as-is.
///
/// # Errors
///
/// Returns [`RowError`] if the row has the wrong field count or the year
/// is not an integer.
pub fn parse_row(line: &str) -> Result<Option<Record>, RowError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split('\t').collect();
    let [id, title, year, genre, director] = fields[..] else {
        return Err(RowError::FieldCount {
            found: fields.len(),
        });
    };

    let year = year.trim().parse::<i32>().map_err(|_| RowError::InvalidYear {
        value: year.to_string(),
    })?;

    Ok(Some(Record::new(id, title, year, genre, director)))
}

/// Parses one raw row, rejecting invalid UTF-8.
///
/// # Errors
///
/// Returns [`RowError::InvalidUtf8`] or any error of [`parse_row`].
pub fn parse_row_bytes(line: &[u8]) -> Result<Option<Record>, RowError> {
    let line = std::str::from_utf8(line).map_err(|_| RowError::InvalidUtf8)?;
    parse_row(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_row() {
        let record = parse_row("tt1\tHamlet\t1910\tDrama\tA Director\n")
            .unwrap()
            .unwrap();
        assert!(record.same_fields(&Record::new("tt1", "Hamlet", 1910, "Drama", "A Director")));
    }

    #[test]
    fn strips_carriage_return() {
        let record = parse_row("tt1\tHamlet\t1910\tDrama\tLang\r\n").unwrap().unwrap();
        assert_eq!(record.director, "Lang");
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse_row(""), Ok(None));
        assert_eq!(parse_row("   \r\n"), Ok(None));
    }

    #[test]
    fn wrong_field_count() {
        assert_eq!(
            parse_row("tt1\tHamlet\t1910\tDrama"),
            Err(RowError::FieldCount { found: 4 })
        );
        assert_eq!(
            parse_row("tt1\tHamlet\t1910\tDrama\tLang\textra"),
            Err(RowError::FieldCount { found: 6 })
        );
    }

    #[test]
    fn year_must_be_an_integer() {
        assert!(matches!(
            parse_row("tt1\tHamlet\t19x0\tDrama\tLang"),
            Err(RowError::InvalidYear { .. })
        ));
        assert_eq!(
            parse_row("tt1\tHamlet\t 1910 \tDrama\tLang").unwrap().unwrap().year,
            1910
        );
        assert_eq!(
            parse_row("tt1\tOld\t-300\tDrama\tLang").unwrap().unwrap().year,
            -300
        );
    }

    #[test]
    fn empty_text_fields_are_allowed() {
        let record = parse_row("tt9\t\t2001\t\t").unwrap().unwrap();
        assert_eq!(record.title, "");
        assert_eq!(record.director, "");
    }

    #[test]
    fn invalid_utf8_bytes() {
        assert_eq!(
            parse_row_bytes(b"tt1\t\xff\xfe\t1910\tDrama\tLang"),
            Err(RowError::InvalidUtf8)
        );
    }
}
