//! The movie record and its field widths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Width of the `id` field in bytes.
pub const ID_WIDTH: usize = 10;
/// Width of the `title` field in bytes.
pub const TITLE_WIDTH: usize = 100;
/// Width of the `year` field in bytes.
pub const YEAR_WIDTH: usize = 4;
/// Width of the `genre` field in bytes.
pub const GENRE_WIDTH: usize = 20;
/// Width of the `director` field in bytes.
pub const DIRECTOR_WIDTH: usize = 100;

/// Encoded size of every record: 234 bytes.
pub const RECORD_SIZE: usize = ID_WIDTH + TITLE_WIDTH + YEAR_WIDTH + GENRE_WIDTH + DIRECTOR_WIDTH;

/// One movie as stored in the record store.
///
/// Equality and hashing look at `id` only: two records with the same id are
/// the same logical movie regardless of their other fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    /// External identifier, e.g. `tt0000001`.
    pub id: String,
    /// Primary title.
    pub title: String,
    /// Release year.
    pub year: i32,
    /// Comma-separated genre tags.
    pub genre: String,
    /// Director name.
    pub director: String,
}

impl Record {
    /// Creates a record from its five fields.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        year: i32,
        genre: impl Into<String>,
        director: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            year,
            genre: genre.into(),
            director: director.into(),
        }
    }

    /// Iterates the trimmed, non-empty genre tags.
    pub fn genres(&self) -> impl Iterator<Item = &str> {
        self.genre
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }

    /// Returns true if any genre tag equals `tag`, ignoring case.
    #[must_use]
    pub fn has_genre(&self, tag: &str) -> bool {
        let wanted = tag.trim().to_lowercase();
        self.genres().any(|g| g.to_lowercase() == wanted)
    }

    /// Returns the record as it reads back after a trip through the store.
    #[must_use]
    pub fn truncated(&self) -> Self {
        use crate::encoder::truncate_utf8;
        Self {
            id: truncate_utf8(&self.id, ID_WIDTH).to_owned(),
            title: truncate_utf8(&self.title, TITLE_WIDTH).to_owned(),
            year: self.year,
            genre: truncate_utf8(&self.genre, GENRE_WIDTH).to_owned(),
            director: truncate_utf8(&self.director, DIRECTOR_WIDTH).to_owned(),
        }
    }

    /// Compares every field, unlike `==` which compares ids.
    #[must_use]
    pub fn same_fields(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.year == other.year
            && self.genre == other.genre
            && self.director == other.director
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) - {} | Director: {}",
            self.id, self.title, self.year, self.genre, self.director
        )
    }
}
