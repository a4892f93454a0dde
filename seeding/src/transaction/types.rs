//! Wire types for transactions and chunks.
//!
//! These mirror the JSON the network's clients already speak: every binary
//! field is unpadded base64url and every integer is a decimal string. The
//! store keeps them in this form so that a chunk can be served back exactly
//! as it was accepted.

use serde::{Deserialize, Serialize};

use crate::codec::{b64_encode, decode_tags, parse_u64, CodecError, Tag};
use crate::crypto::merkle::PreparedChunks;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A format-2 transaction as submitted by a client.
///
/// `data` is optional inline payload (base64url). When it is empty the
/// payload arrives separately as [`Chunk`]s committed to by `data_root`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    pub format: u8,
    /// `base64url(sha256(signature))`.
    pub id: String,
    pub last_tx: String,
    /// Owner's Ed25519 verifying key, base64url.
    pub owner: String,
    /// Tags in wire form (base64url name and value).
    pub tags: Vec<Tag>,
    pub target: String,
    pub quantity: String,
    pub data: String,
    pub data_size: String,
    pub data_root: String,
    pub reward: String,
    pub signature: String,
}

impl Transaction {
    pub fn has_inline_data(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Everything about a transaction except its payload.
///
/// Written once on first acceptance and never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    pub format: u8,
    pub id: String,
    pub last_tx: String,
    pub owner: String,
    pub tags: Vec<Tag>,
    pub target: String,
    pub quantity: String,
    pub data_size: String,
    pub data_root: String,
    pub reward: String,
    pub signature: String,
}

impl TransactionMeta {
    pub fn data_size(&self) -> Result<u64, CodecError> {
        parse_u64("data_size", &self.data_size)
    }

    /// Tags with name and value decoded to UTF-8.
    pub fn decoded_tags(&self) -> Result<Vec<Tag>, CodecError> {
        decode_tags(&self.tags)
    }
}

impl From<&Transaction> for TransactionMeta {
    fn from(tx: &Transaction) -> Self {
        Self {
            format: tx.format,
            id: tx.id.clone(),
            last_tx: tx.last_tx.clone(),
            owner: tx.owner.clone(),
            tags: tx.tags.clone(),
            target: tx.target.clone(),
            quantity: tx.quantity.clone(),
            data_size: tx.data_size.clone(),
            data_root: tx.data_root.clone(),
            reward: tx.reward.clone(),
            signature: tx.signature.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// One chunk of a transaction's payload, as uploaded.
///
/// A chunk names its transaction by `(data_root, data_size)` rather than by
/// id: several transactions may share one payload. `offset` is the chunk's
/// last byte relative to the start of the transaction's data.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Chunk {
    pub data_root: String,
    pub data_size: String,
    pub data_path: String,
    pub offset: String,
    pub chunk: String,
}

impl Chunk {
    /// Build the wire chunk for `index` of a prepared payload.
    ///
    /// `data_root` and `data_size` are taken as given rather than from
    /// `prepared`, so a chunk cut from a payload that doesn't match its
    /// transaction fails verification instead of silently re-rooting.
    pub fn from_prepared(
        data_root: &str,
        data_size: &str,
        prepared: &PreparedChunks,
        index: usize,
        data: &[u8],
    ) -> Option<Self> {
        let proof = prepared.proofs.get(index)?;
        let bytes = prepared.chunk_bytes(index, data)?;
        Some(Self {
            data_root: data_root.to_string(),
            data_size: data_size.to_string(),
            data_path: b64_encode(&proof.proof),
            offset: proof.offset.to_string(),
            chunk: b64_encode(bytes),
        })
    }
}

/// Where a transaction's data sits in the node's global address space.
///
/// `offset` is the allocated end offset; `size` the declared data size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOffset {
    pub offset: u64,
    pub size: u64,
}
