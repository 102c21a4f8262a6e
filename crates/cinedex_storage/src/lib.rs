//! # cinedex storage
//!
//! Byte-level storage backends underneath the cinedex record store.
//!
//! A backend is an **append-only byte sequence**: it hands out the offset of
//! every append and can read any previously written range back. It knows
//! nothing about records, their fixed width, or the indices built on top of
//! them; the record store in `cinedex_core` owns that interpretation.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - a single file on disk, the normal record store
//! - [`InMemoryBackend`] - a growable buffer for tests and scratch catalogs
//!
//! ## Example
//!
//! ```rust
//! use cinedex_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let first = backend.append(&[0u8; 234]).unwrap();
//! let second = backend.append(&[1u8; 234]).unwrap();
//! assert_eq!((first, second), (0, 234));
//! assert_eq!(backend.read_at(second, 234).unwrap(), vec![1u8; 234]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
