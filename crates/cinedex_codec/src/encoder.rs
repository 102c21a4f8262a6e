//! Fixed-width record encoder.

use crate::error::{CodecError, CodecResult};
use crate::record::{Record, DIRECTOR_WIDTH, GENRE_WIDTH, ID_WIDTH, RECORD_SIZE, TITLE_WIDTH};
use bytes::{BufMut, BytesMut};

/// Encodes a record into its fixed-width form.
///
/// Text longer than its field is cut at the last UTF-8 character boundary
/// that fits and the remainder of the field is zero-filled.
///
/// # Errors
///
/// Returns [`CodecError::LayoutMismatch`] only if the field widths do not
/// add up to [`RECORD_SIZE`].
pub fn encode_record(record: &Record) -> CodecResult<[u8; RECORD_SIZE]> {
    let mut buf = BytesMut::with_capacity(RECORD_SIZE);

    put_text(&mut buf, &record.id, ID_WIDTH);
    put_text(&mut buf, &record.title, TITLE_WIDTH);
    buf.put_i32_ne(record.year);
    put_text(&mut buf, &record.genre, GENRE_WIDTH);
    put_text(&mut buf, &record.director, DIRECTOR_WIDTH);

    <[u8; RECORD_SIZE]>::try_from(&buf[..]).map_err(|_| CodecError::LayoutMismatch {
        expected: RECORD_SIZE,
        actual: buf.len(),
    })
}

/// Returns the longest prefix of `text` that fits in `max_bytes` without
/// splitting a character.
#[must_use]
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn put_text(buf: &mut BytesMut, text: &str, width: usize) {
    let kept = truncate_utf8(text, width);
    buf.put_slice(kept.as_bytes());
    buf.put_bytes(0, width - kept.len());
}
