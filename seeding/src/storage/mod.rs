//! # Storage Module
//!
//! Persistent storage for the seeding node.
//!
//! ```text
//! db.rs: sled persistence: tx metadata, chunks, bundled items, offsets
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Chunks keyed by absolute start offset.** That key is the durable
//!    identity of a chunk. Reconstructing a payload is a walk over
//!    consecutive keys.
//!
//! 2. **One sled transaction for the offset pair.** The global counter and
//!    the per-transaction mapping share a transaction so no partial
//!    allocation can ever be observed.
//!
//! 3. **Bincode for on-disk serialization.** JSON is for the HTTP surface;
//!    bincode is for storage.

pub mod db;

pub use db::{DbError, DbResult, SeedDB};
