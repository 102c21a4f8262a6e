//! Fixed-width record decoder.

use crate::error::{CodecError, CodecResult};
use crate::record::{Record, DIRECTOR_WIDTH, GENRE_WIDTH, ID_WIDTH, RECORD_SIZE, TITLE_WIDTH};
use bytes::Buf;

/// Decodes the record at the start of `bytes`.
///
/// Only the first [`RECORD_SIZE`] bytes are read; trailing zero bytes of
/// each text field are stripped.
///
/// # Errors
///
/// Returns [`CodecError::BufferTooShort`] if fewer than [`RECORD_SIZE`]
/// bytes are supplied, or [`CodecError::InvalidUtf8`] if a text field is
/// not valid UTF-8.
pub fn decode_record(bytes: &[u8]) -> CodecResult<Record> {
    if bytes.len() < RECORD_SIZE {
        return Err(CodecError::BufferTooShort {
            expected: RECORD_SIZE,
            actual: bytes.len(),
        });
    }

    let mut buf = &bytes[..RECORD_SIZE];
    let id = take_text(&mut buf, ID_WIDTH, "id")?;
    let title = take_text(&mut buf, TITLE_WIDTH, "title")?;
    let year = buf.get_i32_ne();
    let genre = take_text(&mut buf, GENRE_WIDTH, "genre")?;
    let director = take_text(&mut buf, DIRECTOR_WIDTH, "director")?;

    Ok(Record {
        id,
        title,
        year,
        genre,
        director,
    })
}

fn take_text(buf: &mut &[u8], width: usize, field: &'static str) -> CodecResult<String> {
    let raw = buf.copy_to_bytes(width);
    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
    std::str::from_utf8(&raw[..end])
        .map(str::to_owned)
        .map_err(|_| CodecError::InvalidUtf8 { field })
}
