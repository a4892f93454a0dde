//! Binary bundled items.
//!
//! ```text
//! u16 LE   signature type
//! [u8]     signature              (length fixed by type)
//! [u8]     owner                  (length fixed by type)
//! u8       target present (0|1)   then 32 bytes if 1
//! u8       anchor present (0|1)   then 32 bytes if 1
//! u64 LE   tag count
//! u64 LE   tag bytes length
//! [u8]     avro tag array
//! [u8]     data                   (rest of the item)
//! ```
//!
//! The item id is `base64url(sha256(signature))`.

use super::avro;
use super::{BundleError, SignatureType};
use crate::codec::{b64_decode, b64_encode, CodecError, Tag};
use crate::crypto::hash::{deep_hash, DeepHashItem};
use crate::crypto::keys::{verify_owner_signature, OwnerKeypair};
use crate::transaction::signing::transaction_id;

const OPTIONAL_FIELD_LENGTH: usize = 32;

/// A decoded bundled item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleItem {
    pub signature_type: SignatureType,
    pub signature: Vec<u8>,
    pub owner: Vec<u8>,
    /// Empty when absent.
    pub target: Vec<u8>,
    /// Empty when absent.
    pub anchor: Vec<u8>,
    /// Plain UTF-8 tags.
    pub tags: Vec<Tag>,
    /// Payload, base64url.
    pub data: String,
    pub id: String,
    tag_bytes: Vec<u8>,
}

impl BundleItem {
    pub fn data_bytes(&self) -> Result<Vec<u8>, CodecError> {
        b64_decode("data", &self.data)
    }

    /// The deep-hash an item's owner signs.
    pub fn signature_data(&self) -> Result<[u8; 48], CodecError> {
        Ok(item_signature_data(
            self.signature_type,
            &self.owner,
            &self.target,
            &self.anchor,
            &self.tag_bytes,
            &self.data_bytes()?,
        ))
    }

    /// Check the item's signature. Only Ed25519-family signatures can be
    /// checked by this node; other types fail with
    /// [`BundleError::UnsupportedSignature`].
    pub fn verify(&self) -> Result<(), BundleError> {
        if !self.signature_type.is_ed25519() {
            return Err(BundleError::UnsupportedSignature(self.signature_type));
        }
        let message = self.signature_data()?;
        verify_owner_signature(&self.owner, &message, &self.signature)
            .map_err(|_| BundleError::InvalidSignature)
    }
}

fn item_signature_data(
    signature_type: SignatureType,
    owner: &[u8],
    target: &[u8],
    anchor: &[u8],
    tag_bytes: &[u8],
    data: &[u8],
) -> [u8; 48] {
    deep_hash(&DeepHashItem::List(vec![
        DeepHashItem::blob(b"dataitem".as_slice()),
        DeepHashItem::blob(b"1".as_slice()),
        DeepHashItem::blob(signature_type.code().to_string()),
        DeepHashItem::blob(owner),
        DeepHashItem::blob(target),
        DeepHashItem::blob(anchor),
        DeepHashItem::blob(tag_bytes),
        DeepHashItem::blob(data),
    ]))
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], BundleError> {
        let available = self.data.len() - self.pos;
        if len > available {
            return Err(BundleError::Truncated {
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u16_le(&mut self) -> Result<u16, BundleError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u64_le(&mut self) -> Result<u64, BundleError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn optional(&mut self, field: &'static str) -> Result<Vec<u8>, BundleError> {
        match self.take(1)?[0] {
            0 => Ok(Vec::new()),
            1 => Ok(self.take(OPTIONAL_FIELD_LENGTH)?.to_vec()),
            flag => Err(BundleError::InvalidPresenceByte { field, flag }),
        }
    }

    fn rest(self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

/// Decode a binary bundled item. Signatures are not checked here.
pub fn decode_bundle_item(binary: &[u8]) -> Result<BundleItem, BundleError> {
    let mut reader = Reader { data: binary, pos: 0 };

    let signature_type = SignatureType::from_code(reader.u16_le()?)?;
    let signature = reader.take(signature_type.signature_length())?.to_vec();
    let owner = reader.take(signature_type.owner_length())?.to_vec();
    let target = reader.optional("target")?;
    let anchor = reader.optional("anchor")?;

    let tag_count = reader.u64_le()?;
    let tag_bytes_len = reader.u64_le()?;
    let tag_bytes_len = usize::try_from(tag_bytes_len)
        .map_err(|_| BundleError::InvalidTags("tag byte length too large".into()))?;
    let tag_bytes = reader.take(tag_bytes_len)?.to_vec();
    let tags = avro::decode_tags(&tag_bytes)?;
    if tags.len() as u64 != tag_count {
        return Err(BundleError::TagCountMismatch {
            declared: tag_count,
            actual: tags.len(),
        });
    }

    let data = b64_encode(reader.rest());
    let id = transaction_id(&signature);

    Ok(BundleItem {
        signature_type,
        signature,
        owner,
        target,
        anchor,
        tags,
        data,
        id,
        tag_bytes,
    })
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Builds and signs an Ed25519 bundled item.
///
/// Only single items are produced; packing items into a parent
/// transaction is left to the uploading client.
#[derive(Debug, Clone, Default)]
pub struct BundleItemBuilder {
    target: Vec<u8>,
    anchor: Vec<u8>,
    tags: Vec<Tag>,
    data: Vec<u8>,
}

impl BundleItemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: [u8; 32]) -> Self {
        self.target = target.to_vec();
        self
    }

    pub fn anchor(mut self, anchor: [u8; 32]) -> Self {
        self.anchor = anchor.to_vec();
        self
    }

    pub fn tag(mut self, name: &str, value: &str) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Sign with `keypair` and serialize to the binary item format.
    pub fn sign(self, keypair: &OwnerKeypair) -> Vec<u8> {
        let signature_type = SignatureType::Ed25519;
        let owner = keypair.owner_bytes();
        let tag_bytes = avro::encode_tags(&self.tags);
        let message = item_signature_data(
            signature_type,
            &owner,
            &self.target,
            &self.anchor,
            &tag_bytes,
            &self.data,
        );
        let signature = keypair.sign(&message);

        let mut out = Vec::with_capacity(
            2 + signature.len() + owner.len() + 2 * (1 + OPTIONAL_FIELD_LENGTH) + 16 + tag_bytes.len() + self.data.len(),
        );
        out.extend_from_slice(&signature_type.code().to_le_bytes());
        out.extend_from_slice(&signature);
        out.extend_from_slice(&owner);
        for field in [&self.target, &self.anchor] {
            if field.is_empty() {
                out.push(0);
            } else {
                out.push(1);
                out.extend_from_slice(field);
            }
        }
        out.extend_from_slice(&(self.tags.len() as u64).to_le_bytes());
        out.extend_from_slice(&(tag_bytes.len() as u64).to_le_bytes());
        out.extend_from_slice(&tag_bytes);
        out.extend_from_slice(&self.data);
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
