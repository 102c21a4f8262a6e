//! # cinedex Testkit
//!
//! Test utilities for cinedex.
//!
//! This crate provides:
//! - Catalog fixtures backed by temporary directories
//! - Property-based generators for records and queries
//! - A brute-force catalog model that answers queries by linear scan
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cinedex_testkit::prelude::*;
//!
//! #[test]
//! fn hamlet_by_prefix() {
//!     let catalog = TestCatalog::with_records(&sample_records());
//!     let found = catalog.query(&Query::new().title_prefix("ham")).unwrap();
//!     assert_eq!(found.len(), 2);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use cinedex_core::{Query, Record};
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
