//! # Protocol Configuration & Constants
//!
//! Every magic number the seeding core depends on lives here. Most of them
//! are fixed by the permaweb network itself: change the chunk sizes and our
//! data roots stop matching everybody else's.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Version string reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// The only transaction format this node accepts. Format 2 transactions
/// commit to their payload through a data root rather than carrying it inline
/// in the signature data.
pub const TX_FORMAT: u8 = 2;

// ---------------------------------------------------------------------------
// Chunking
// ---------------------------------------------------------------------------

/// Maximum size of a single data chunk: 256 KiB.
pub const MAX_CHUNK_SIZE: u64 = 256 * 1024;

/// Minimum size of a non-final chunk. When the tail left after a full chunk
/// would be smaller than this, the last two chunks are rebalanced.
pub const MIN_CHUNK_SIZE: u64 = 32 * 1024;

/// Size of every Merkle node id and chunk data hash (SHA-256).
pub const HASH_SIZE: usize = 32;

/// Size of an offset note: a big-endian integer padded to 32 bytes.
pub const NOTE_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Keys & Signatures
// ---------------------------------------------------------------------------

/// Owner public key length in bytes (Ed25519).
pub const OWNER_KEY_LENGTH: usize = 32;

/// Owner signature length in bytes (Ed25519).
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Manifests
// ---------------------------------------------------------------------------

/// Content type tag value that marks a payload as a path manifest.
pub const MANIFEST_CONTENT_TYPE: &str = "application/x.arweave-manifest+json";

/// Manifest document discriminator.
pub const MANIFEST_KIND: &str = "arweave/paths";

/// File appended to directory-style requests that miss in the manifest.
pub const DEFAULT_INDEX_FILE: &str = "index.html";

/// Tag name carrying a payload's MIME type.
pub const CONTENT_TYPE_TAG: &str = "Content-Type";

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default port for the HTTP API.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 8081;
