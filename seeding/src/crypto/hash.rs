//! # Hashing Utilities
//!
//! The permaweb settled on the SHA-2 family, so that is what we use:
//!
//! - **SHA-256**: chunk data hashes, Merkle node ids, transaction and
//!   bundled-item ids (`sha256(signature)`).
//! - **SHA-384**: the deep-hash that produces a transaction's signature
//!   data.
//!
//! ## Deep hash
//!
//! The deep-hash folds a tree of byte blobs into one digest while binding
//! both the shape and the length of every element:
//!
//! ```text
//! blob(b)  = sha384( sha384("blob" ++ len(b)) ++ sha384(b) )
//! list(xs) = fold(sha384("list" ++ len(xs)), |acc, x| sha384(acc ++ deep(x)))
//! ```
//!
//! Lengths are rendered as decimal ASCII.

use sha2::{Digest, Sha256, Sha384};

/// Compute the SHA-256 hash of the input data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 over the concatenation of several byte slices, without
/// materializing the concatenation.
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the SHA-384 hash of the input data.
pub fn sha384(data: &[u8]) -> [u8; 48] {
    let mut hasher = Sha384::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 48];
    output.copy_from_slice(&result);
    output
}

fn sha384_multi(parts: &[&[u8]]) -> [u8; 48] {
    let mut hasher = Sha384::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 48];
    output.copy_from_slice(&result);
    output
}

/// One node of the structure fed to [`deep_hash`].
#[derive(Debug, Clone)]
pub enum DeepHashItem {
    Blob(Vec<u8>),
    List(Vec<DeepHashItem>),
}

impl DeepHashItem {
    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Blob(bytes.into())
    }
}

/// Compute the deep-hash of a blob/list tree.
pub fn deep_hash(item: &DeepHashItem) -> [u8; 48] {
    match item {
        DeepHashItem::Blob(data) => {
            let tag = format!("blob{}", data.len());
            let tag_hash = sha384(tag.as_bytes());
            let data_hash = sha384(data);
            sha384_multi(&[tag_hash.as_slice(), data_hash.as_slice()])
        }
        DeepHashItem::List(items) => {
            let tag = format!("list{}", items.len());
            let mut acc = sha384(tag.as_bytes());
            for child in items {
                let child_hash = deep_hash(child);
                acc = sha384_multi(&[acc.as_slice(), child_hash.as_slice()]);
            }
            acc
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
