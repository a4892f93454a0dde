//! # SeedDB: Persistent Storage Engine
//!
//! The persistence layer for the seeding node, built on sled's embedded
//! key-value store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! | Tree                  | Key                               | Value                      |
//! |-----------------------|-----------------------------------|----------------------------|
//! | `tx_meta`             | tx id (UTF-8)                     | `bincode(TransactionMeta)` |
//! | `chunks`              | absolute start offset (8B BE)     | `bincode(Chunk)`           |
//! | `bundle_items`        | item id (UTF-8)                   | raw item binary            |
//! | `tx_data_end_offsets` | data root bytes ++ data size (BE) | end offset (8B BE)         |
//! | `metadata`            | key (UTF-8)                       | value (bytes)              |
//!
//! Offsets are stored as big-endian u64 so that sled's lexicographic
//! ordering matches numeric ordering.
//!
//! ## Atomicity
//!
//! The global end-offset counter (in `metadata`) and the per-transaction
//! end-offset mapping are only ever written together, inside one sled
//! transaction spanning both trees. Either both land or neither does.
//!
//! Transaction metadata and bundle items are insert-once: a second write
//! for the same id fails with [`DbError::KeyExists`] and leaves the first
//! value in place.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use crate::transaction::{Chunk, TransactionMeta};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("key not found: {0}")]
    NotFound(String),

    /// An insert-once record already exists under this key.
    #[error("key already exists: {0}")]
    KeyExists(String),

    /// The (data root, data size) pair already has an end offset.
    #[error("end offset already allocated for data root {data_root} and size {data_size}")]
    AlreadyAllocated { data_root: String, data_size: u64 },

    #[error("global end offset {current} cannot grow by {data_size}")]
    OffsetOverflow { current: u64, data_size: u64 },
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

/// Well-known key in the `metadata` tree for the global end offset.
const META_ALL_DATA_END_OFFSET: &[u8] = b"all_data_end_offset";

/// Key of the `tx_data_end_offsets` tree: raw data root then size, BE.
fn tx_offset_key(data_root: &[u8], data_size: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(data_root.len() + 8);
    key.extend_from_slice(data_root);
    key.extend_from_slice(&data_size.to_be_bytes());
    key
}

fn decode_u64(bytes: &[u8]) -> DbResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| DbError::Serialization("invalid offset bytes".to_string()))?;
    Ok(u64::from_be_bytes(raw))
}

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// SeedDB
// ---------------------------------------------------------------------------

/// Persistent storage engine for the seeding node.
///
/// Wraps a sled `Db` instance and exposes typed accessors for transaction
/// metadata, chunks, bundled items and the two offset records.
///
/// # Thread Safety
///
/// sled is thread-safe and `SeedDB` is cheap to clone: every clone shares
/// the same trees. Serializing the check-then-allocate sequence across
/// callers is *not* this type's job; see `ingest::OffsetAllocator`.
#[derive(Debug, Clone)]
pub struct SeedDB {
    db: Db,
    tx_meta: Tree,
    /// Chunks keyed by absolute start offset.
    chunks: Tree,
    bundle_items: Tree,
    tx_data_end_offsets: Tree,
    metadata: Tree,
}

impl SeedDB {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let tx_meta = db.open_tree("tx_meta")?;
        let chunks = db.open_tree("chunks")?;
        let bundle_items = db.open_tree("bundle_items")?;
        let tx_data_end_offsets = db.open_tree("tx_data_end_offsets")?;
        let metadata = db.open_tree("metadata")?;

        Ok(Self {
            db,
            tx_meta,
            chunks,
            bundle_items,
            tx_data_end_offsets,
            metadata,
        })
    }

    // -- Transaction metadata -----------------------------------------------

    /// Persist transaction metadata if none exists for its id.
    ///
    /// Fails with [`DbError::KeyExists`] otherwise; the stored record is
    /// never replaced.
    pub fn save_tx_meta(&self, meta: &TransactionMeta) -> DbResult<()> {
        let bytes = encode(meta)?;
        self.tx_meta
            .compare_and_swap(meta.id.as_bytes(), None as Option<&[u8]>, Some(bytes))?
            .map_err(|_| DbError::KeyExists(meta.id.clone()))
    }

    pub fn load_tx_meta(&self, id: &str) -> DbResult<Option<TransactionMeta>> {
        match self.tx_meta.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn has_tx_meta(&self, id: &str) -> DbResult<bool> {
        Ok(self.tx_meta.contains_key(id.as_bytes())?)
    }

    // -- Bundled items ------------------------------------------------------

    /// Persist a bundled item's raw binary if none exists for its id.
    pub fn save_bundle_item(&self, id: &str, binary: &[u8]) -> DbResult<()> {
        self.bundle_items
            .compare_and_swap(id.as_bytes(), None as Option<&[u8]>, Some(binary))?
            .map_err(|_| DbError::KeyExists(id.to_string()))
    }

    pub fn load_bundle_item(&self, id: &str) -> DbResult<Option<Vec<u8>>> {
        Ok(self.bundle_items.get(id.as_bytes())?.map(|bytes| bytes.to_vec()))
    }

    pub fn has_bundle_item(&self, id: &str) -> DbResult<bool> {
        Ok(self.bundle_items.contains_key(id.as_bytes())?)
    }

    // -- Chunks -------------------------------------------------------------

    /// Persist a chunk at its absolute start offset.
    ///
    /// A chunk's key is fully determined by its transaction's allocation, so
    /// rewriting a key only ever rewrites the same bytes.
    pub fn save_chunk(&self, absolute_start: u64, chunk: &Chunk) -> DbResult<()> {
        let bytes = encode(chunk)?;
        self.chunks.insert(absolute_start.to_be_bytes(), bytes)?;
        Ok(())
    }

    pub fn load_chunk(&self, absolute_start: u64) -> DbResult<Option<Chunk>> {
        match self.chunks.get(absolute_start.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Offsets ------------------------------------------------------------

    /// The exclusive upper bound of all bytes ever allocated. Zero on a
    /// fresh database.
    pub fn load_all_data_end_offset(&self) -> DbResult<u64> {
        match self.metadata.get(META_ALL_DATA_END_OFFSET)? {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(0),
        }
    }

    pub fn load_tx_data_end_offset(&self, data_root: &[u8], data_size: u64) -> DbResult<Option<u64>> {
        let key = tx_offset_key(data_root, data_size);
        match self.tx_data_end_offsets.get(key)? {
            Some(bytes) => Ok(Some(decode_u64(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Advance the global end offset by `data_size` and record the new end
    /// as the end offset of `(data_root, data_size)`, atomically.
    ///
    /// Both writes happen in one sled transaction over the `metadata` and
    /// `tx_data_end_offsets` trees. If the mapping already exists the
    /// transaction aborts with [`DbError::AlreadyAllocated`] after the
    /// counter write was staged, and neither write is applied.
    pub fn commit_tx_data_end_offset(&self, data_root: &[u8], data_size: u64) -> DbResult<u64> {
        let key = tx_offset_key(data_root, data_size);

        let result = (&self.metadata, &self.tx_data_end_offsets).transaction(
            |(metadata, offsets)| -> ConflictableTransactionResult<u64, DbError> {
                let current = match metadata.get(META_ALL_DATA_END_OFFSET)? {
                    Some(bytes) => decode_u64(&bytes).map_err(ConflictableTransactionError::Abort)?,
                    None => 0,
                };
                let new_end = current.checked_add(data_size).ok_or(
                    ConflictableTransactionError::Abort(DbError::OffsetOverflow { current, data_size }),
                )?;
                let end_bytes = new_end.to_be_bytes();

                metadata.insert(META_ALL_DATA_END_OFFSET, &end_bytes[..])?;

                if offsets.get(key.as_slice())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(DbError::AlreadyAllocated {
                        data_root: crate::codec::b64_encode(data_root),
                        data_size,
                    }));
                }
                offsets.insert(key.as_slice(), &end_bytes[..])?;

                Ok(new_end)
            },
        );

        match result {
            Ok(end) => Ok(end),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(DbError::Sled(e)),
        }
    }

    // -- Utility operations -------------------------------------------------

    pub fn tx_count(&self) -> usize {
        self.tx_meta.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn bundle_item_count(&self) -> usize {
        self.bundle_items.len()
    }

    pub fn allocation_count(&self) -> usize {
        self.tx_data_end_offsets.len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
