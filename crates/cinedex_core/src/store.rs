//! Append-only record store.

use crate::error::{CoreError, CoreResult};
use crate::types::Offset;
use cinedex_codec::{decode_record, encode_record, Record, RECORD_SIZE};
use cinedex_storage::{FileBackend, InMemoryBackend, StorageBackend};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Records fetched per backend read during a sequential scan.
const SCAN_BATCH: usize = 64;

/// An append-only sequence of fixed-width records.
///
/// Every record is [`RECORD_SIZE`] bytes, so the offset returned by
/// [`append`](Self::append) is always a multiple of the record size and
/// identifies the record for the rest of the store's life.
///
/// A store opened on a path that does not exist yet reads as empty; the
/// file is created by the first append.
pub struct RecordStore {
    path: Option<PathBuf>,
    backend: Option<Box<dyn StorageBackend>>,
    sync_on_append: bool,
}

impl RecordStore {
    /// Opens the store at `path`.
    ///
    /// A missing file is not an error: the store reads as empty until the
    /// first append creates it.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be opened.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let backend = FileBackend::open_existing(path)?
            .map(|backend| Box::new(backend) as Box<dyn StorageBackend>);
        Ok(Self {
            path: Some(path.to_path_buf()),
            backend,
            sync_on_append: false,
        })
    }

    /// Creates an empty store held in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_backend(Box::new(InMemoryBackend::new()))
    }

    /// Creates a store over an existing backend.
    #[must_use]
    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            path: None,
            backend: Some(backend),
            sync_on_append: false,
        }
    }

    /// Sets whether every append is followed by a sync.
    #[must_use]
    pub fn with_sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Returns the file path, if the store is file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns true if the backing file exists (always true in memory).
    #[must_use]
    pub fn exists(&self) -> bool {
        self.backend.is_some()
    }

    /// Returns the store size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn size(&self) -> CoreResult<u64> {
        match &self.backend {
            Some(backend) => Ok(backend.size()?),
            None => Ok(0),
        }
    }

    /// Returns the number of complete records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn len(&self) -> CoreResult<u64> {
        Ok(self.size()? / RECORD_SIZE as u64)
    }

    /// Returns true if the store holds no complete record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its size.
    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Appends a record and returns its offset.
    ///
    /// Text fields longer than their width are truncated. If the write
    /// fails the store is cut back to its previous size.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MisalignedStore`] if the store ends in a partial
    /// record, or the storage error that aborted the write.
    pub fn append(&mut self, record: &Record) -> CoreResult<Offset> {
        let bytes = encode_record(record)?;
        let sync = self.sync_on_append;
        let backend = self.writable_backend()?;

        let before = backend.size()?;
        if before % RECORD_SIZE as u64 != 0 {
            return Err(CoreError::MisalignedStore { size: before });
        }

        let written = backend.append(&bytes).and_then(|offset| {
            if sync {
                backend.sync()?;
            }
            Ok(offset)
        });

        match written {
            Ok(offset) => Ok(Offset::new(offset)),
            Err(err) => {
                if let Err(rollback) = backend.truncate(before) {
                    warn!(%rollback, size = before, "failed to roll back partial append");
                }
                Err(err.into())
            }
        }
    }

    /// Reads the record at `offset`.
    ///
    /// Returns `Ok(None)` if the offset is not on a record boundary, lies
    /// beyond the last complete record, or the store file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error on an I/O failure or if the bytes do not decode.
    pub fn read_at(&self, offset: Offset) -> CoreResult<Option<Record>> {
        if !offset.is_aligned() {
            return Ok(None);
        }
        let Some(backend) = &self.backend else {
            return Ok(None);
        };

        match backend.read_at(offset.as_u64(), RECORD_SIZE) {
            Ok(bytes) => Ok(Some(decode_record(&bytes)?)),
            Err(err) if err.is_read_past_end() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Reads every complete record in store order.
    ///
    /// # Errors
    ///
    /// Returns the first read or decode error.
    pub fn read_all(&self) -> CoreResult<Vec<Record>> {
        self.scan()?
            .map(|item| item.map(|(_, record)| record))
            .collect()
    }

    /// Returns an iterator over `(offset, record)` pairs in store order.
    ///
    /// A trailing partial record is not visited.
    ///
    /// # Errors
    ///
    /// Returns an error if the store size cannot be determined.
    pub fn scan(&self) -> CoreResult<RecordIter<'_>> {
        let size = self.size()?;
        Ok(RecordIter {
            backend: self.backend.as_deref(),
            next: 0,
            end: size - size % RECORD_SIZE as u64,
            buffer: Vec::new(),
            cursor: 0,
        })
    }

    /// Flushes pending writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> CoreResult<()> {
        if let Some(backend) = &mut self.backend {
            backend.flush()?;
        }
        Ok(())
    }

    /// Syncs the store to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&mut self) -> CoreResult<()> {
        if let Some(backend) = &mut self.backend {
            backend.sync()?;
        }
        Ok(())
    }

    fn writable_backend(&mut self) -> CoreResult<&mut Box<dyn StorageBackend>> {
        if self.backend.is_none() {
            if let Some(path) = &self.path {
                self.backend = Some(Box::new(FileBackend::open_with_create_dirs(path)?));
            }
        }
        self.backend
            .as_mut()
            .ok_or_else(|| CoreError::invalid_operation("record store has no backend"))
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .field("sync_on_append", &self.sync_on_append)
            .finish()
    }
}

/// Sequential iterator over the records of a [`RecordStore`].
///
/// Reads the backend in batches of whole records.
pub struct RecordIter<'a> {
    backend: Option<&'a dyn StorageBackend>,
    next: u64,
    end: u64,
    buffer: Vec<u8>,
    cursor: usize,
}

impl RecordIter<'_> {
    fn refill(&mut self, backend: &dyn StorageBackend) -> CoreResult<()> {
        let remaining = (self.end - self.next) as usize;
        let len = remaining.min(SCAN_BATCH * RECORD_SIZE);
        self.buffer = backend.read_at(self.next, len)?;
        self.cursor = 0;
        Ok(())
    }
}

impl Iterator for RecordIter<'_> {
    type Item = CoreResult<(Offset, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        let backend = self.backend?;
        if self.next >= self.end {
            return None;
        }

        if self.cursor >= self.buffer.len() {
            if let Err(err) = self.refill(backend) {
                // Stop after reporting; a failed read is not retried.
                self.next = self.end;
                return Some(Err(err));
            }
        }

        let offset = Offset::new(self.next);
        let slot = &self.buffer[self.cursor..self.cursor + RECORD_SIZE];
        self.cursor += RECORD_SIZE;
        self.next += RECORD_SIZE as u64;

        Some(decode_record(slot).map(|record| (offset, record)).map_err(Into::into))
    }
}
