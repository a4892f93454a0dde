//! Transaction and chunk verification.
//!
//! Nothing is written to the store until it passes one of these checks.
//! Both are pure: they decode, hash and compare, and never touch storage.
//! The checks are ordered cheapest first so that garbage is rejected before
//! any signature or Merkle work is done.

use thiserror::Error;

use super::signing::{signature_data, transaction_id};
use super::types::{Chunk, Transaction};
use crate::codec::{b64_decode, parse_u64, CodecError};
use crate::config::{HASH_SIZE, TX_FORMAT};
use crate::crypto::hash::sha256;
use crate::crypto::keys::{verify_owner_signature, SignatureError};
use crate::crypto::merkle::validate_path;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a transaction or chunk was rejected.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("unsupported transaction format {0}")]
    UnsupportedFormat(u8),

    /// A field could not be decoded at all.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// `id` is not `base64url(sha256(signature))`.
    #[error("transaction id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: String, actual: String },

    #[error("invalid data root: expected 32 bytes, got {0}")]
    InvalidDataRoot(usize),

    #[error("signature check failed: {0}")]
    Signature(#[from] SignatureError),

    #[error("chunk is empty")]
    EmptyChunk,

    /// The relative offset falls outside the transaction's data.
    #[error("chunk offset {offset} outside data of size {data_size}")]
    OffsetOutOfRange { offset: u64, data_size: u64 },

    #[error("merkle path does not prove a chunk at offset {offset}")]
    InvalidProof { offset: u64 },

    #[error("chunk bytes do not match the proven data hash")]
    DataHashMismatch,
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Verify a signed transaction.
///
/// Checks, in order:
///
/// 1. format is 2;
/// 2. `data_size` is a decimal integer and `data_root` decodes to 32 bytes
///    (or is empty for a transaction without data);
/// 3. `id` equals `base64url(sha256(signature))`;
/// 4. the signature verifies under `owner` over the deep-hash of the
///    signed fields.
pub fn verify_transaction(tx: &Transaction) -> Result<(), VerificationError> {
    if tx.format != TX_FORMAT {
        return Err(VerificationError::UnsupportedFormat(tx.format));
    }

    let data_size = parse_u64("data_size", &tx.data_size)?;
    let data_root = b64_decode("data_root", &tx.data_root)?;
    let root_ok = data_root.len() == HASH_SIZE || (data_size == 0 && data_root.is_empty());
    if !root_ok {
        return Err(VerificationError::InvalidDataRoot(data_root.len()));
    }

    let signature = b64_decode("signature", &tx.signature)?;
    let expected = transaction_id(&signature);
    if tx.id != expected {
        return Err(VerificationError::IdMismatch {
            expected,
            actual: tx.id.clone(),
        });
    }

    let owner = b64_decode("owner", &tx.owner)?;
    let message = signature_data(tx)?;
    verify_owner_signature(&owner, &message, &signature)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Chunks
// ---------------------------------------------------------------------------

/// A chunk that passed [`verify_chunk`], with its fields decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedChunk {
    pub data_root: Vec<u8>,
    pub data_size: u64,
    /// Relative end offset inside the transaction's data.
    pub offset: u64,
    pub data: Vec<u8>,
}

impl VerifiedChunk {
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Verify a chunk's Merkle inclusion proof against its data root.
///
/// The path must prove a leaf covering `offset` under `data_root` within
/// `[0, data_size)`, and the leaf's data hash must be the SHA-256 of the
/// chunk bytes. `offset` must be the last byte of the proven leaf and the
/// chunk must span the whole leaf, so placement by `offset` is exact.
pub fn verify_chunk(chunk: &Chunk) -> Result<VerifiedChunk, VerificationError> {
    let data_root = b64_decode("data_root", &chunk.data_root)?;
    if data_root.len() != HASH_SIZE {
        return Err(VerificationError::InvalidDataRoot(data_root.len()));
    }
    let data_size = parse_u64("data_size", &chunk.data_size)?;
    let offset = parse_u64("offset", &chunk.offset)?;
    let path = b64_decode("data_path", &chunk.data_path)?;
    let data = b64_decode("chunk", &chunk.chunk)?;

    if data.is_empty() {
        return Err(VerificationError::EmptyChunk);
    }
    if offset >= data_size {
        return Err(VerificationError::OffsetOutOfRange { offset, data_size });
    }

    let proven = validate_path(&data_root, offset, 0, data_size, &path)
        .ok_or(VerificationError::InvalidProof { offset })?;
    if proven.data_hash != sha256(&data) {
        return Err(VerificationError::DataHashMismatch);
    }
    let leaf_len = proven.right_bound.saturating_sub(proven.left_bound);
    if offset != proven.right_bound.saturating_sub(1) || data.len() as u64 != leaf_len {
        return Err(VerificationError::InvalidProof { offset });
    }

    Ok(VerifiedChunk {
        data_root,
        data_size,
        offset,
        data,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
