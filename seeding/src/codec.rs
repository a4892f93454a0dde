//! Wire codecs: base64url, decimal integers and tags.
//!
//! Everything on the wire is a string. Binary fields (ids, owners, data
//! roots, proofs, chunk bytes) travel as unpadded base64url; integers travel
//! as decimal strings so that JavaScript clients never lose precision.
//! Tags travel with both name and value base64url-encoded.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding wire fields.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64url in {field}: {reason}")]
    InvalidBase64 { field: &'static str, reason: String },

    #[error("invalid integer in {field}: {value:?}")]
    InvalidInteger { field: &'static str, value: String },

    #[error("invalid utf-8 in tag {field}")]
    InvalidUtf8 { field: &'static str },
}

/// Encode bytes as unpadded base64url.
pub fn b64_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url, tolerating trailing `=` padding and the standard
/// alphabet's `+`/`/` that some clients still send.
pub fn b64_decode(field: &'static str, s: &str) -> Result<Vec<u8>, CodecError> {
    let trimmed = s.trim_end_matches('=');
    let normalized: String = trimmed
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| CodecError::InvalidBase64 {
            field,
            reason: e.to_string(),
        })
}

/// Parse a decimal string as an unsigned 64-bit integer.
///
/// Signs, whitespace and empty strings are rejected.
pub fn parse_u64(field: &'static str, s: &str) -> Result<u64, CodecError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::InvalidInteger {
            field,
            value: s.to_string(),
        });
    }
    s.parse::<u64>().map_err(|_| CodecError::InvalidInteger {
        field,
        value: s.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// A name/value pair attached to a transaction or bundled item.
///
/// The same shape is used for both the wire form (base64url fields) and the
/// decoded form (plain UTF-8); which one a `Vec<Tag>` holds depends on where
/// it came from. [`encode_tags`] and [`decode_tags`] convert between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Encode plain tags into their wire form.
pub fn encode_tags(tags: &[Tag]) -> Vec<Tag> {
    tags.iter()
        .map(|t| Tag {
            name: b64_encode(t.name.as_bytes()),
            value: b64_encode(t.value.as_bytes()),
        })
        .collect()
}

/// Decode wire tags into plain UTF-8 tags.
pub fn decode_tags(tags: &[Tag]) -> Result<Vec<Tag>, CodecError> {
    tags.iter()
        .map(|t| {
            let name = String::from_utf8(b64_decode("tag.name", &t.name)?)
                .map_err(|_| CodecError::InvalidUtf8 { field: "name" })?;
            let value = String::from_utf8(b64_decode("tag.value", &t.value)?)
                .map_err(|_| CodecError::InvalidUtf8 { field: "value" })?;
            Ok(Tag { name, value })
        })
        .collect()
}

/// Find the first tag with the given name (case-insensitive) in a decoded
/// tag list.
pub fn find_tag<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
        .map(|t| t.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn b64_round_trip_is_unpadded() {
        let encoded = b64_encode(b"seed");
        assert_eq!(encoded, "c2VlZA");
        assert_eq!(b64_decode("data", &encoded).unwrap(), b"seed");
    }

    #[test]
    fn b64_decode_accepts_padding_and_std_alphabet() {
        assert_eq!(b64_decode("data", "c2VlZA==").unwrap(), b"seed");
        // 0xfb 0xff encodes to "-_8" in url-safe and "+/8" in standard.
        assert_eq!(b64_decode("data", "+/8").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(b64_decode("data", "-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn b64_decode_rejects_garbage() {
        let err = b64_decode("data_root", "not base64!").unwrap_err();
        assert!(matches!(err, CodecError::InvalidBase64 { field: "data_root", .. }));
    }

    #[test]
    fn parse_u64_accepts_plain_decimals() {
        assert_eq!(parse_u64("size", "0").unwrap(), 0);
        assert_eq!(parse_u64("size", "262144").unwrap(), 262_144);
        assert_eq!(parse_u64("size", "18446744073709551615").unwrap(), u64::MAX);
    }

    #[test]
    fn parse_u64_rejects_signs_and_overflow() {
        for bad in ["", "-1", "+1", " 1", "1.0", "abc", "18446744073709551616"] {
            assert!(parse_u64("size", bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn tags_round_trip_through_wire_form() {
        let plain = vec![
            Tag::new("Content-Type", "text/html"),
            Tag::new("App-Name", "permaseed"),
        ];
        let wire = encode_tags(&plain);
        assert_eq!(wire[0].name, "Q29udGVudC1UeXBl");
        assert_eq!(decode_tags(&wire).unwrap(), plain);
    }

    #[test]
    fn find_tag_is_case_insensitive() {
        let tags = vec![Tag::new("content-type", "image/png")];
        assert_eq!(find_tag(&tags, "Content-Type"), Some("image/png"));
        assert_eq!(find_tag(&tags, "App-Name"), None);
    }
}
