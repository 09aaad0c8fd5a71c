//! The index-key codec: a type-tagged, order-preserving byte layout that
//! lets a single ordered cursor answer prefix, equality, and range queries
//! across heterogeneous value types.
//!
//! Layout: `<type-tag:1> <value-bytes:n> <sep1=0x00> <sep2=0xFF> <primary-key:m>`.
//!
//! `0x00` is the smallest possible byte, so `<tag><value><00><FF>` is the
//! smallest key greater than every row whose value is a strict prefix of
//! `value` — `seek(<tag><prefix><00><FF>)` lands on the first row whose
//! value starts with `prefix`. `0xFF` cannot appear mid-codepoint in valid
//! UTF-8, so it never collides with a string value byte at that position.
//! For descending seeks the codec emits `<tag><value><FF><FF>`, which sorts
//! strictly greater than every row whose value equals or extends `value`;
//! stepping `prev()` from there lands on the last matching row.

use crate::error::{Error, Result};
use crate::value::{IndexedValue, TAG_BOOL, TAG_FLOAT64, TAG_NIL, TAG_NO_INDEX, TAG_STRING};

const SEP1: u8 = 0x00;
const SEP2: u8 = 0xFF;
/// Strings are truncated to at most this many bytes before indexing (see
/// spec §9 open question: two long strings sharing this prefix collide in
/// the index; `get()` on the primary namespace remains correct regardless).
pub const MAX_INDEXED_STRING_LEN: usize = 255;

pub(crate) fn truncated_value_bytes(value: &IndexedValue) -> Option<Vec<u8>> {
    let mut bytes = value.value_bytes()?;
    if value.tag() == TAG_STRING && bytes.len() > MAX_INDEXED_STRING_LEN {
        bytes.truncate(MAX_INDEXED_STRING_LEN);
    }
    Some(bytes)
}

/// Build a full index row key for `(value, primary_key)`. Returns `None` if
/// `value` coerces to `NoIndex` (the caller should skip creating a row).
pub fn encode_index_key(value: &IndexedValue, primary_key: &[u8]) -> Option<Vec<u8>> {
    let value_bytes = truncated_value_bytes(value)?;
    let mut out = Vec::with_capacity(1 + value_bytes.len() + 2 + primary_key.len());
    out.push(value.tag());
    out.extend_from_slice(&value_bytes);
    out.push(SEP1);
    out.push(SEP2);
    out.extend_from_slice(primary_key);
    Some(out)
}

/// `<tag><value><00><FF>` — the seek target used by `seek_first`/ascending
/// prefix search: the smallest key greater than every row whose value is a
/// strict prefix of `value`.
pub fn seek_prefix_ascending(value: &IndexedValue) -> Option<Vec<u8>> {
    let value_bytes = truncated_value_bytes(value)?;
    let mut out = Vec::with_capacity(1 + value_bytes.len() + 2);
    out.push(value.tag());
    out.extend_from_slice(&value_bytes);
    out.push(SEP1);
    out.push(SEP2);
    Some(out)
}

/// `<tag><value><FF><FF>` — the seek target used by `seek_last`/descending
/// search: sorts strictly greater than every row whose value equals or
/// extends `value`; stepping `prev()` from the landed position yields the
/// greatest matching row.
pub fn seek_prefix_descending(value: &IndexedValue) -> Option<Vec<u8>> {
    let value_bytes = truncated_value_bytes(value)?;
    let mut out = Vec::with_capacity(1 + value_bytes.len() + 2);
    out.push(value.tag());
    out.extend_from_slice(&value_bytes);
    out.push(SEP2);
    out.push(SEP2);
    Some(out)
}

/// The type tag stored in the first byte of an encoded index key.
pub fn tag_of(index_key: &[u8]) -> Result<u8> {
    index_key
        .first()
        .copied()
        .ok_or_else(|| Error::CorruptIndexKey("empty index key".to_string()))
}

/// Extract the value-bytes segment from a full encoded index key. Anything
/// other than the four known tags is corruption.
pub fn value_bytes_of(index_key: &[u8]) -> Result<Vec<u8>> {
    let tag = tag_of(index_key)?;
    let rest = &index_key[1..];
    match tag {
        TAG_BOOL => {
            if rest.len() < 1 {
                return Err(Error::CorruptIndexKey("truncated bool index key".into()));
            }
            Ok(rest[0..1].to_vec())
        }
        TAG_FLOAT64 => {
            if rest.len() < 8 {
                return Err(Error::CorruptIndexKey("truncated float64 index key".into()));
            }
            Ok(rest[0..8].to_vec())
        }
        TAG_STRING => {
            let sep_pos = find_separator(rest)
                .ok_or_else(|| Error::CorruptIndexKey("missing separator in string index key".into()))?;
            Ok(rest[..sep_pos].to_vec())
        }
        TAG_NIL => Ok(Vec::new()),
        TAG_NO_INDEX => Err(Error::CorruptIndexKey("NoIndex tag in stored index key".into())),
        other => Err(Error::CorruptIndexKey(format!("unknown index tag {other:#x}"))),
    }
}

fn find_separator(haystack: &[u8]) -> Option<usize> {
    haystack.windows(2).position(|w| w == [SEP1, SEP2])
}
