//! Index persistence for saving/loading indexes to/from disk.
//!
//! Persisted indexes are a startup optimization: everything they hold is
//! derivable from the record store, so a file that fails any check below is
//! reported and rebuilt rather than repaired.
//!
//! ## Format
//!
//! ```text
//! magic     4 bytes  "CDIX"
//! version   u8       1
//! kind      u8       0 = btree, 1 = hash, 2 = trie
//! key type  u8       0 = none, 1 = i32, 2 = string
//! reserved  u8       0
//! length    u64 BE   payload length
//! crc32     u32 BE   checksum of payload
//! payload   CBOR     index snapshot
//! ```
//!
//! ## Invariants
//!
//! - Header, length and checksum are verified before the payload is decoded
//! - Decoded indexes are structurally validated before they are returned
//! - Files are written to a temporary sibling and renamed into place

use crate::error::{CoreError, CoreResult};
use crate::index::traits::KeyType;
use crate::index::{BTreeIndex, HashIndex, IndexKey, PrefixTrie};
use bytes::{Buf, BufMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Magic bytes for index files: "CDIX"
pub const INDEX_MAGIC: [u8; 4] = *b"CDIX";

/// Current index file format version.
pub const INDEX_VERSION: u8 = 1;

/// Size of the fixed header preceding the payload.
pub const HEADER_SIZE: usize = 4 + 1 + 1 + 1 + 1 + 8 + 4;

/// Index kind codes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Arena B-tree (range queries).
    BTree = 0,
    /// Hash index (equality lookups).
    Hash = 1,
    /// Prefix trie (title prefixes).
    Trie = 2,
}

impl TryFrom<u8> for IndexKind {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::BTree),
            1 => Ok(Self::Hash),
            2 => Ok(Self::Trie),
            _ => Err(CoreError::invalid_format(format!(
                "unknown index kind: {value}"
            ))),
        }
    }
}

/// Decoded header of a persisted index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    /// Which index structure the payload holds.
    pub kind: IndexKind,
    /// Key type of the index.
    pub key_type: KeyType,
    /// Payload length in bytes.
    pub payload_len: u64,
    /// CRC32 of the payload.
    pub checksum: u32,
}

impl IndexHeader {
    fn write(&self, buf: &mut Vec<u8>) {
        buf.put_slice(&INDEX_MAGIC);
        buf.put_u8(INDEX_VERSION);
        buf.put_u8(self.kind as u8);
        buf.put_u8(self.key_type as u8);
        buf.put_u8(0);
        buf.put_u64(self.payload_len);
        buf.put_u32(self.checksum);
    }

    /// Reads and checks the fixed header at the start of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] on a short buffer, bad magic,
    /// unknown version, kind or key type.
    pub fn read(data: &[u8]) -> CoreResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(CoreError::invalid_format(format!(
                "index file too small: {} bytes",
                data.len()
            )));
        }

        let mut buf = &data[..HEADER_SIZE];
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if magic != INDEX_MAGIC {
            return Err(CoreError::invalid_format("invalid index file magic"));
        }

        let version = buf.get_u8();
        if version != INDEX_VERSION {
            return Err(CoreError::invalid_format(format!(
                "unsupported index version: {version}"
            )));
        }

        let kind = IndexKind::try_from(buf.get_u8())?;
        let key_byte = buf.get_u8();
        let key_type = KeyType::from_u8(key_byte).ok_or_else(|| {
            CoreError::invalid_format(format!("unknown index key type: {key_byte}"))
        })?;
        let _reserved = buf.get_u8();

        Ok(Self {
            kind,
            key_type,
            payload_len: buf.get_u64(),
            checksum: buf.get_u32(),
        })
    }
}

/// An index that can be written to and restored from an index file.
pub trait PersistentIndex: Serialize + DeserializeOwned {
    /// Kind written into the header.
    const KIND: IndexKind;

    /// Key type written into the header.
    const KEY_TYPE: KeyType;

    /// Checks the structural invariants of a freshly decoded index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexCorruption`] on a violation.
    fn check_invariants(&self) -> CoreResult<()>;

    /// Encodes the index into a complete index file image.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the snapshot cannot be encoded.
    fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        let mut payload = Vec::new();
        ciborium::into_writer(self, &mut payload)
            .map_err(|e| CoreError::invalid_format(format!("index encoding failed: {e}")))?;

        let header = IndexHeader {
            kind: Self::KIND,
            key_type: Self::KEY_TYPE,
            payload_len: payload.len() as u64,
            checksum: crc32fast::hash(&payload),
        };
        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
        header.write(&mut out);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Decodes and validates an index file image.
    ///
    /// # Errors
    ///
    /// Returns an error if the header does not describe this index type,
    /// the length or checksum is wrong, the payload does not decode, or
    /// the decoded index violates an invariant.
    fn from_bytes(data: &[u8]) -> CoreResult<Self> {
        let header = IndexHeader::read(data)?;
        if header.kind != Self::KIND || header.key_type != Self::KEY_TYPE {
            return Err(CoreError::invalid_format(format!(
                "expected a {:?} index over {:?} keys, found {:?} over {:?}",
                Self::KIND,
                Self::KEY_TYPE,
                header.kind,
                header.key_type
            )));
        }

        let payload = &data[HEADER_SIZE..];
        if payload.len() as u64 != header.payload_len {
            return Err(CoreError::invalid_format(format!(
                "payload is {} bytes, header says {}",
                payload.len(),
                header.payload_len
            )));
        }

        let actual = crc32fast::hash(payload);
        if actual != header.checksum {
            return Err(CoreError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        let index: Self = ciborium::from_reader(payload)
            .map_err(|e| CoreError::invalid_format(format!("index decoding failed: {e}")))?;
        index.check_invariants()?;
        Ok(index)
    }

    /// Writes the index to `path` through a temporary sibling file.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any file operation fails.
    fn save(&self, path: &Path) -> CoreResult<()> {
        let data = self.to_bytes()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = temp_sibling(path);
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Reads and validates the index stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or any error of
    /// [`from_bytes`](Self::from_bytes).
    fn load(path: &Path) -> CoreResult<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl<K: IndexKey> PersistentIndex for BTreeIndex<K> {
    const KIND: IndexKind = IndexKind::BTree;
    const KEY_TYPE: KeyType = K::KEY_TYPE;

    fn check_invariants(&self) -> CoreResult<()> {
        self.validate()
    }
}

impl<K: IndexKey> PersistentIndex for HashIndex<K> {
    const KIND: IndexKind = IndexKind::Hash;
    const KEY_TYPE: KeyType = K::KEY_TYPE;

    fn check_invariants(&self) -> CoreResult<()> {
        self.validate()
    }
}

impl PersistentIndex for PrefixTrie {
    const KIND: IndexKind = IndexKind::Trie;
    const KEY_TYPE: KeyType = KeyType::None;

    fn check_invariants(&self) -> CoreResult<()> {
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Index;
    use crate::types::Offset;
    use tempfile::tempdir;

    fn years() -> BTreeIndex<i32> {
        let entries = (0..40).map(|i| (1900 + (i % 7), Offset::from_index(i as usize)));
        BTreeIndex::from_entries(2, entries).unwrap()
    }

    #[test]
    fn header_size() {
        assert_eq!(HEADER_SIZE, 20);
    }

    #[test]
    fn btree_roundtrip() {
        let index = years();
        let loaded = BTreeIndex::<i32>::from_bytes(&index.to_bytes().unwrap()).unwrap();

        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.min_degree(), 2);
        assert_eq!(loaded.search_range(&1901, &1903), index.search_range(&1901, &1903));
    }

    #[test]
    fn hash_roundtrip() {
        let mut index = HashIndex::new();
        index.insert("Lang".to_string(), Offset::new(0));
        index.insert("Lang".to_string(), Offset::new(468));
        index.insert("Murnau".to_string(), Offset::new(234));

        let loaded = HashIndex::<String>::from_bytes(&index.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(
            loaded.lookup(&"Lang".to_string()),
            vec![Offset::new(0), Offset::new(468)]
        );
    }

    #[test]
    fn hash_encoding_is_deterministic() {
        let mut a = HashIndex::new();
        let mut b = HashIndex::new();
        for name in ["x", "y", "z", "w"] {
            a.insert(name.to_string(), Offset::new(0));
        }
        for name in ["w", "z", "y", "x"] {
            b.insert(name.to_string(), Offset::new(0));
        }
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }

    #[test]
    fn trie_roundtrip() {
        let mut trie = PrefixTrie::new();
        trie.insert("Nosferatu".into(), Offset::new(0));
        trie.insert("Metropolis".into(), Offset::new(234));

        let loaded = PrefixTrie::from_bytes(&trie.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded.search_prefix("nos"), vec![Offset::new(0)]);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let bytes = years().to_bytes().unwrap();
        assert!(matches!(
            PrefixTrie::from_bytes(&bytes),
            Err(CoreError::InvalidFormat { .. })
        ));
        assert!(BTreeIndex::<String>::from_bytes(&bytes).is_err());
    }

    #[test]
    fn flipped_payload_byte_fails_checksum() {
        let mut bytes = years().to_bytes().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            BTreeIndex::<i32>::from_bytes(&bytes),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn truncated_file_rejected() {
        let bytes = years().to_bytes().unwrap();
        assert!(BTreeIndex::<i32>::from_bytes(&bytes[..10]).is_err());
        assert!(BTreeIndex::<i32>::from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = years().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(BTreeIndex::<i32>::from_bytes(&bytes).is_err());
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx").join("year.btree");
        let index = years();

        index.save(&path).unwrap();
        assert!(!temp_sibling(&path).exists());

        let loaded = BTreeIndex::<i32>::load(&path).unwrap();
        assert_eq!(loaded.len(), index.len());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            BTreeIndex::<i32>::load(&dir.path().join("absent")),
            Err(CoreError::Io(_))
        ));
    }
}
