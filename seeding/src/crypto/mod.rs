//! # Cryptographic Primitives
//!
//! Everything the seeding core needs to decide whether bytes are what they
//! claim to be:
//!
//! - **hash**: SHA-256, SHA-384 and the deep-hash used for signing.
//! - **keys**: Ed25519 owner keypairs and signature verification.
//! - **merkle**: payload chunking, data roots, inclusion proofs and path
//!   validation.
//!
//! These are thin wrappers over audited implementations (`sha2`,
//! `ed25519-dalek`). Nothing here rolls its own primitive.

pub mod hash;
pub mod keys;
pub mod merkle;

pub use hash::{deep_hash, sha256, sha384, DeepHashItem};
pub use keys::{verify_owner_signature, OwnerKeypair, SignatureError};
pub use merkle::{prepare_chunks, validate_path, ChunkProof, ChunkRange, PreparedChunks, ValidatedPath};
