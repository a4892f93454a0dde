//! # Merkle Chunking
//!
//! A transaction's payload is split into chunks, and the chunks are committed
//! to by a binary Merkle tree whose root is the transaction's data root.
//! Every chunk ships with an inclusion path, so a node can accept chunks
//! one by one from untrusted uploaders.
//!
//! ## Node ids
//!
//! ```text
//! leaf   = sha256( sha256(data_hash) ++ sha256(note(max_byte_range)) )
//! branch = sha256( sha256(left.id) ++ sha256(right.id) ++ sha256(note(left.max_byte_range)) )
//! ```
//!
//! A note is the offset as a big-endian integer left-padded to 32 bytes.
//! An odd node at the end of a layer is promoted unchanged.
//!
//! ## Paths
//!
//! A path is every branch on the way down (`left.id ++ right.id ++ note`)
//! followed by the leaf (`data_hash ++ note`). [`validate_path`] walks it
//! top-down, using each branch note to decide which side the destination
//! offset falls in.

use super::hash::{sha256, sha256_multi};
use crate::config::{HASH_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, NOTE_SIZE};

/// Byte range of one chunk within its transaction, plus its data hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRange {
    pub data_hash: [u8; 32],
    pub min_byte_range: u64,
    pub max_byte_range: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.max_byte_range - self.min_byte_range
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inclusion path for one chunk. `offset` is the chunk's last byte,
/// relative to the start of the transaction's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkProof {
    pub offset: u64,
    pub proof: Vec<u8>,
}

/// A payload split into chunks with its data root and per-chunk proofs.
///
/// `chunks[i]` and `proofs[i]` describe the same chunk.
#[derive(Debug, Clone)]
pub struct PreparedChunks {
    pub data_root: [u8; 32],
    pub chunks: Vec<ChunkRange>,
    pub proofs: Vec<ChunkProof>,
}

impl PreparedChunks {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Slice chunk `index` out of the payload the chunks were prepared from.
    pub fn chunk_bytes<'a>(&self, index: usize, data: &'a [u8]) -> Option<&'a [u8]> {
        let range = self.chunks.get(index)?;
        let start = usize::try_from(range.min_byte_range).ok()?;
        let end = usize::try_from(range.max_byte_range).ok()?;
        data.get(start..end)
    }
}

/// Render an offset as a 32-byte big-endian note.
pub fn note(value: u64) -> [u8; NOTE_SIZE] {
    let mut buf = [0u8; NOTE_SIZE];
    buf[NOTE_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    buf
}

/// Read a note back. Values that don't fit in 64 bits are rejected.
fn read_note(bytes: &[u8]) -> Option<u64> {
    if bytes.len() != NOTE_SIZE || bytes[..NOTE_SIZE - 8].iter().any(|b| *b != 0) {
        return None;
    }
    let tail: [u8; 8] = bytes[NOTE_SIZE - 8..].try_into().ok()?;
    Some(u64::from_be_bytes(tail))
}

// ---------------------------------------------------------------------------
// Chunking
// ---------------------------------------------------------------------------

/// Split a payload into chunk ranges.
///
/// Chunks are `MAX_CHUNK_SIZE` bytes, except that when the remainder after a
/// full chunk would fall under `MIN_CHUNK_SIZE`, the last two chunks split
/// the tail evenly (rounding the first one up). The final range may be
/// empty when the payload is an exact multiple of the chunk size.
pub fn chunk_data(data: &[u8]) -> Vec<ChunkRange> {
    let mut chunks = Vec::new();
    let mut rest = data;
    let mut cursor = 0u64;

    while rest.len() as u64 >= MAX_CHUNK_SIZE {
        let mut chunk_size = MAX_CHUNK_SIZE as usize;
        let next_chunk_size = rest.len() - chunk_size;
        if next_chunk_size > 0 && (next_chunk_size as u64) < MIN_CHUNK_SIZE {
            chunk_size = rest.len().div_ceil(2);
        }

        let (chunk, tail) = rest.split_at(chunk_size);
        cursor += chunk.len() as u64;
        chunks.push(ChunkRange {
            data_hash: sha256(chunk),
            min_byte_range: cursor - chunk.len() as u64,
            max_byte_range: cursor,
        });
        rest = tail;
    }

    chunks.push(ChunkRange {
        data_hash: sha256(rest),
        min_byte_range: cursor,
        max_byte_range: cursor + rest.len() as u64,
    });
    chunks
}

#[derive(Debug)]
enum MerkleNode {
    Leaf {
        id: [u8; 32],
        data_hash: [u8; 32],
        max_byte_range: u64,
    },
    Branch {
        id: [u8; 32],
        byte_range: u64,
        max_byte_range: u64,
        left: Box<MerkleNode>,
        right: Box<MerkleNode>,
    },
}

impl MerkleNode {
    fn id(&self) -> [u8; 32] {
        match self {
            Self::Leaf { id, .. } | Self::Branch { id, .. } => *id,
        }
    }

    fn max_byte_range(&self) -> u64 {
        match self {
            Self::Leaf { max_byte_range, .. } | Self::Branch { max_byte_range, .. } => {
                *max_byte_range
            }
        }
    }

    fn leaf(chunk: &ChunkRange) -> Self {
        let id = sha256_multi(&[
            sha256(&chunk.data_hash).as_slice(),
            sha256(&note(chunk.max_byte_range)).as_slice(),
        ]);
        Self::Leaf {
            id,
            data_hash: chunk.data_hash,
            max_byte_range: chunk.max_byte_range,
        }
    }

    fn branch(left: MerkleNode, right: MerkleNode) -> Self {
        let byte_range = left.max_byte_range();
        let id = sha256_multi(&[
            sha256(&left.id()).as_slice(),
            sha256(&right.id()).as_slice(),
            sha256(&note(byte_range)).as_slice(),
        ]);
        Self::Branch {
            id,
            byte_range,
            max_byte_range: right.max_byte_range(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

fn build_layers(mut nodes: Vec<MerkleNode>) -> Option<MerkleNode> {
    while nodes.len() > 1 {
        let mut next = Vec::with_capacity(nodes.len().div_ceil(2));
        let mut iter = nodes.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => next.push(MerkleNode::branch(left, right)),
                None => next.push(left),
            }
        }
        nodes = next;
    }
    nodes.pop()
}

fn collect_proofs(node: &MerkleNode, prefix: Vec<u8>, out: &mut Vec<ChunkProof>) {
    match node {
        MerkleNode::Leaf {
            data_hash,
            max_byte_range,
            ..
        } => {
            let mut proof = prefix;
            proof.extend_from_slice(data_hash);
            proof.extend_from_slice(&note(*max_byte_range));
            out.push(ChunkProof {
                offset: max_byte_range.saturating_sub(1),
                proof,
            });
        }
        MerkleNode::Branch {
            byte_range,
            left,
            right,
            ..
        } => {
            let mut partial = prefix;
            partial.extend_from_slice(&left.id());
            partial.extend_from_slice(&right.id());
            partial.extend_from_slice(&note(*byte_range));
            collect_proofs(left, partial.clone(), out);
            collect_proofs(right, partial, out);
        }
    }
}

/// Chunk a payload, build its Merkle tree and produce one proof per chunk.
///
/// Returns `None` for an empty payload, which has no data root. A trailing
/// empty chunk produced by [`chunk_data`] is dropped.
pub fn prepare_chunks(data: &[u8]) -> Option<PreparedChunks> {
    if data.is_empty() {
        return None;
    }

    let mut chunks = chunk_data(data);
    if chunks.len() > 1 && chunks.last().is_some_and(ChunkRange::is_empty) {
        chunks.pop();
    }

    let leaves = chunks.iter().map(MerkleNode::leaf).collect();
    let root = build_layers(leaves)?;

    let mut proofs = Vec::with_capacity(chunks.len());
    collect_proofs(&root, Vec::new(), &mut proofs);

    Some(PreparedChunks {
        data_root: root.id(),
        chunks,
        proofs,
    })
}

// ---------------------------------------------------------------------------
// Path validation
// ---------------------------------------------------------------------------

/// Result of a successful path walk: the leaf's bounds and data hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath {
    pub offset: u64,
    pub left_bound: u64,
    pub right_bound: u64,
    pub chunk_size: u64,
    pub data_hash: [u8; 32],
}

/// Check that `path` proves a chunk covering `dest` under Merkle root `id`.
///
/// `left_bound`/`right_bound` bracket the search, normally `0` and the
/// transaction's data size. A destination at or past the right bound is
/// re-checked from offset zero, matching the network's reference behaviour.
pub fn validate_path(
    id: &[u8],
    dest: u64,
    left_bound: u64,
    right_bound: u64,
    path: &[u8],
) -> Option<ValidatedPath> {
    if right_bound == 0 {
        return None;
    }
    if dest >= right_bound {
        return validate_path(id, 0, right_bound - 1, right_bound, path);
    }

    if path.len() == HASH_SIZE + NOTE_SIZE {
        let (data_hash, end_note) = path.split_at(HASH_SIZE);
        let leaf_id = sha256_multi(&[sha256(data_hash).as_slice(), sha256(end_note).as_slice()]);
        if leaf_id.as_slice() != id {
            return None;
        }
        return Some(ValidatedPath {
            offset: right_bound - 1,
            left_bound,
            right_bound,
            chunk_size: right_bound.saturating_sub(left_bound),
            data_hash: data_hash.try_into().ok()?,
        });
    }

    if path.len() < 2 * HASH_SIZE + NOTE_SIZE {
        return None;
    }

    let (left, rest) = path.split_at(HASH_SIZE);
    let (right, rest) = rest.split_at(HASH_SIZE);
    let (offset_note, remainder) = rest.split_at(NOTE_SIZE);

    let branch_id = sha256_multi(&[
        sha256(left).as_slice(),
        sha256(right).as_slice(),
        sha256(offset_note).as_slice(),
    ]);
    if branch_id.as_slice() != id {
        return None;
    }

    let offset = read_note(offset_note)?;
    if dest < offset {
        validate_path(left, dest, left_bound, right_bound.min(offset), remainder)
    } else {
        validate_path(right, dest, left_bound.max(offset), right_bound, remainder)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
