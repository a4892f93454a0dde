//! Avro encoding of a bundled item's tag array.
//!
//! The schema is an array of `{ name: bytes, value: bytes }` records.
//! Avro writes an array as blocks: a zigzag-varint item count followed by
//! the items, terminated by a zero count. A negative count is followed by
//! the block's byte size, which readers may use to skip and we ignore.

use super::BundleError;
use crate::codec::Tag;

/// Append `value` as a zigzag varint.
pub(crate) fn encode_long(buf: &mut Vec<u8>, value: i64) {
    let mut zigzag = ((value << 1) ^ (value >> 63)) as u64;
    loop {
        let mut byte = (zigzag & 0x7F) as u8;
        zigzag >>= 7;
        if zigzag > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if zigzag == 0 {
            break;
        }
    }
}

/// Decode a zigzag varint. Returns (value, bytes_consumed).
pub(crate) fn decode_long(data: &[u8]) -> Result<(i64, usize), BundleError> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            let decoded = ((value >> 1) as i64) ^ -((value & 1) as i64);
            return Ok((decoded, i + 1));
        }
        shift += 7;
        if shift >= 64 {
            return Err(BundleError::InvalidTags("varint overflow".into()));
        }
    }
    Err(BundleError::InvalidTags("truncated varint".into()))
}

/// Serialize plain tags. An empty list encodes to zero bytes.
pub fn encode_tags(tags: &[Tag]) -> Vec<u8> {
    let mut buf = Vec::new();
    if tags.is_empty() {
        return buf;
    }
    encode_long(&mut buf, tags.len() as i64);
    for tag in tags {
        encode_bytes(&mut buf, tag.name.as_bytes());
        encode_bytes(&mut buf, tag.value.as_bytes());
    }
    encode_long(&mut buf, 0);
    buf
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_long(buf, bytes.len() as i64);
    buf.extend_from_slice(bytes);
}

/// Deserialize a tag array back into plain tags.
pub fn decode_tags(data: &[u8]) -> Result<Vec<Tag>, BundleError> {
    let mut tags = Vec::new();
    if data.is_empty() {
        return Ok(tags);
    }

    let mut pos = 0usize;
    loop {
        let (count, consumed) = decode_long(&data[pos..])?;
        pos += consumed;
        if count == 0 {
            break;
        }
        if count < 0 {
            // Block byte size; the items are read one by one regardless.
            let (_size, consumed) = decode_long(&data[pos..])?;
            pos += consumed;
        }
        for _ in 0..count.unsigned_abs() {
            let (name, consumed) = decode_string(&data[pos..], "name")?;
            pos += consumed;
            let (value, consumed) = decode_string(&data[pos..], "value")?;
            pos += consumed;
            tags.push(Tag { name, value });
        }
    }

    if pos != data.len() {
        return Err(BundleError::InvalidTags(format!(
            "{} trailing bytes after tag array",
            data.len() - pos
        )));
    }
    Ok(tags)
}

fn decode_string(data: &[u8], field: &str) -> Result<(String, usize), BundleError> {
    let (len, consumed) = decode_long(data)?;
    let len = usize::try_from(len)
        .map_err(|_| BundleError::InvalidTags(format!("negative {field} length")))?;
    let end = consumed
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| BundleError::InvalidTags(format!("{field} extends past tag data")))?;
    let text = String::from_utf8(data[consumed..end].to_vec())
        .map_err(|_| BundleError::InvalidTags(format!("tag {field} is not utf-8")))?;
    Ok((text, end))
}
