// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Permaseed: Seeding Node Core
//!
//! The storage core of a permaweb seeding node: clients hand us whole
//! transactions or individual data chunks, and we verify them, place them in
//! the node's single global byte-address space, and later hand the payloads
//! back by id, by bundled-item id, or through a path manifest.
//!
//! ## Architecture
//!
//! - **codec**: base64url, decimal integers and tag encoding. The wire
//!   vocabulary every other module speaks.
//! - **crypto**: SHA-256/SHA-384 hashing, the deep-hash used for signing,
//!   owner keys and Merkle chunking/path validation.
//! - **transaction**: transaction and chunk wire types, signing,
//!   building and verification.
//! - **bundle**: decoding of binary bundled items.
//! - **storage**: the sled-backed persistent store.
//! - **ingest**: the offset allocator, chunk placement math and the
//!   submission service.
//! - **resolve**: content resolution (transaction → bundled item → miss)
//!   and manifest path resolution.
//! - **config**: protocol constants.
//! - **error**: the error kinds surfaced to callers.
//!
//! ## Ordering
//!
//! Every transaction owns a contiguous region of the global address space,
//! allocated exactly once per `(data_root, data_size)` pair. The global end
//! offset and the per-pair mapping are always written together in a single
//! storage transaction, and a process-wide submission lock serializes the
//! check-then-allocate sequence.

pub mod bundle;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ingest;
pub mod resolve;
pub mod storage;
pub mod transaction;

pub use error::{SeedError, SeedResult};
pub use ingest::{OffsetAllocator, SeedingService, TxRegion};
pub use resolve::{Content, ContentResolver, ContentSource, ManifestData};
pub use storage::SeedDB;
