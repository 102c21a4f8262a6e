//! File-based storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A storage backend over a single file.
///
/// The file size is cached at open time and advanced on every append, so
/// reads beyond the logical end are rejected without touching the disk.
///
/// # Example
///
/// ```no_run
/// use cinedex_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("records.bin")).unwrap();
/// let offset = backend.append(&[0u8; 234]).unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::from_file(path, file)
    }

    /// Opens a file backend only if the file already exists.
    ///
    /// Returns `Ok(None)` for a missing file so that readers can treat an
    /// absent store as an empty one.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than the file being absent.
    pub fn open_existing(path: &Path) -> StorageResult<Option<Self>> {
        match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => Self::from_file(path, file).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Opens or creates a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or file cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    fn from_file(path: &Path, file: File) -> StorageResult<Self> {
        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        // Seeking moves the shared cursor, so reads take the write lock.
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut size = self.size.write();
        if data.is_empty() {
            return Ok(*size);
        }

        let mut file = self.file.write();
        let offset = *size;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        *size += data.len() as u64;

        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.write().flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.write().sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();

        // The cached size may lag behind a torn write, so compare against
        // the file itself as well.
        let on_disk = file.metadata()?.len();
        if new_size > (*size).max(on_disk) {
            return Err(StorageError::InvalidTruncate {
                requested: new_size,
                size: *size,
            });
        }

        file.set_len(new_size)?;
        *size = new_size;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SLOT: usize = 234;

    fn slot(fill: u8) -> Vec<u8> {
        vec![fill; SLOT]
    }

    #[test]
    fn open_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.bin");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn open_existing_reports_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.bin");

        assert!(FileBackend::open_existing(&path).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn appends_hand_out_consecutive_slots() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.bin");
        let mut backend = FileBackend::open(&path).unwrap();

        for i in 0..4u8 {
            let offset = backend.append(&slot(i)).unwrap();
            assert_eq!(offset, u64::from(i) * SLOT as u64);
        }

        assert_eq!(backend.size().unwrap(), 4 * SLOT as u64);
        assert_eq!(backend.read_at(2 * SLOT as u64, SLOT).unwrap(), slot(2));
    }

    #[test]
    fn read_of_partial_slot_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.bin");
        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(&slot(7)).unwrap();

        let result = backend.read_at(100, SLOT);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
        assert!(result.unwrap_err().is_read_past_end());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.bin");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append(&slot(1)).unwrap();
            backend.append(&slot(2)).unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open_existing(&path).unwrap().unwrap();
        assert_eq!(backend.size().unwrap(), 2 * SLOT as u64);
        assert_eq!(backend.read_at(SLOT as u64, SLOT).unwrap(), slot(2));
    }

    #[test]
    fn truncate_rolls_back_last_slot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.bin");
        let mut backend = FileBackend::open(&path).unwrap();

        backend.append(&slot(1)).unwrap();
        let rolled_back = backend.append(&slot(2)).unwrap();
        backend.truncate(rolled_back).unwrap();

        assert_eq!(backend.size().unwrap(), SLOT as u64);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), SLOT as u64);
        assert_eq!(backend.append(&slot(3)).unwrap(), rolled_back);
    }

    #[test]
    fn truncate_cannot_grow() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.bin");
        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(&slot(1)).unwrap();

        let result = backend.truncate(10 * SLOT as u64);
        assert!(matches!(result, Err(StorageError::InvalidTruncate { .. })));
    }

    #[test]
    fn empty_append_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.bin");
        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(&slot(1)).unwrap();

        assert_eq!(backend.append(&[]).unwrap(), SLOT as u64);
        assert_eq!(backend.size().unwrap(), SLOT as u64);
    }

    #[test]
    fn create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog").join("data").join("records.bin");

        let backend = FileBackend::open_with_create_dirs(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert_eq!(backend.path(), path);
    }
}
