//! # cinedex codec
//!
//! Fixed-width binary encoding for cinedex movie records.
//!
//! Every record occupies exactly [`RECORD_SIZE`] bytes, which is what lets
//! the record store address records by byte offset alone.
//!
//! ## Layout
//!
//! ```text
//! offset  width  field
//!      0     10  id        UTF-8, zero-padded
//!     10    100  title     UTF-8, zero-padded
//!    110      4  year      i32, native byte order
//!    114     20  genre     UTF-8, zero-padded
//!    134    100  director  UTF-8, zero-padded
//! ```
//!
//! Oversized text is truncated to its field width at the last character
//! boundary that fits; this is not an error. Decoding strips trailing zero
//! bytes.
//!
//! ## Usage
//!
//! ```
//! use cinedex_codec::{decode_record, encode_record, Record, RECORD_SIZE};
//!
//! let record = Record::new("tt1", "Hamlet", 1910, "Drama", "A Director");
//! let bytes = encode_record(&record).unwrap();
//! assert_eq!(bytes.len(), RECORD_SIZE);
//!
//! let decoded = decode_record(&bytes).unwrap();
//! assert_eq!(decoded.title, "Hamlet");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod record;

pub use decoder::decode_record;
pub use encoder::{encode_record, truncate_utf8};
pub use error::{CodecError, CodecResult};
pub use record::{
    Record, DIRECTOR_WIDTH, GENRE_WIDTH, ID_WIDTH, RECORD_SIZE, TITLE_WIDTH, YEAR_WIDTH,
};

/// Types with a fixed-width binary encoding.
pub trait Encode {
    /// Encodes this value into its fixed-width form.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Types that can be decoded from their fixed-width binary form.
pub trait Decode: Sized {
    /// Decodes a value from the start of `bytes`.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Record {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        encode_record(self).map(|bytes| bytes.to_vec())
    }
}

impl Decode for Record {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        decode_record(bytes)
    }
}
