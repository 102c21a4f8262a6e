//! CLI command implementations.

pub mod import;
pub mod inspect;
pub mod query;
pub mod rebuild;
pub mod stats;

use crate::error::{CliError, CliResult};
use cinedex_core::{Config, IndexManager, Query, SortKey};
use clap::{Args, ValueEnum};
use std::path::Path;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Sort field accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Title, ignoring case.
    Title,
    /// Release year.
    Year,
    /// Director, ignoring case.
    Director,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Title => SortKey::Title,
            SortArg::Year => SortKey::Year,
            SortArg::Director => SortKey::Director,
        }
    }
}

/// Filters and ordering for the `query` command.
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Exact record id; other filters are ignored
    #[arg(long)]
    pub id: Option<String>,

    /// Exact release year
    #[arg(long, conflicts_with_all = ["year_from", "year_to"])]
    pub year: Option<i32>,

    /// Lowest release year (inclusive)
    #[arg(long)]
    pub year_from: Option<i32>,

    /// Highest release year (inclusive)
    #[arg(long)]
    pub year_to: Option<i32>,

    /// Title prefix, case-insensitive
    #[arg(short, long)]
    pub title: Option<String>,

    /// Exact director name
    #[arg(short, long)]
    pub director: Option<String>,

    /// Genre tag, case-insensitive
    #[arg(short, long)]
    pub genre: Option<String>,

    /// Sort field
    #[arg(short, long, value_enum, default_value_t = SortArg::Title)]
    pub sort: SortArg,

    /// Sort in descending order
    #[arg(long)]
    pub desc: bool,

    /// Maximum number of records shown
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl QueryArgs {
    /// Builds the core query.
    pub fn to_query(&self) -> CliResult<Query> {
        let mut query = Query::new().sort_by(self.sort.into());
        if self.desc {
            query = query.descending();
        }
        if let Some(id) = &self.id {
            query = query.id(id.as_str());
        }
        if let Some(title) = &self.title {
            query = query.title_prefix(title.as_str());
        }
        if let Some(director) = &self.director {
            query = query.director(director.as_str());
        }
        if let Some(genre) = &self.genre {
            query = query.genre(genre.as_str());
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }

        query = match (self.year, self.year_from, self.year_to) {
            (Some(year), _, _) => query.year(year),
            (None, None, None) => query,
            (None, from, to) => {
                let (from, to) = (from.unwrap_or(i32::MIN), to.unwrap_or(i32::MAX));
                if from > to {
                    return Err(CliError::InvertedYearRange { from, to });
                }
                query.year_range(from, to)
            }
        };
        Ok(query)
    }
}

/// Opens the catalog in `dir`, rebuilding unusable indexes.
pub fn open_catalog(dir: &Path) -> CliResult<IndexManager> {
    Ok(IndexManager::open_or_rebuild(Config::in_dir(dir))?)
}
