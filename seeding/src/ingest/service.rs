//! The submission service.
//!
//! [`SeedingService`] is the single entry point for writes. Both submission
//! paths verify first and only then touch storage; allocation and chunk
//! placement run under the allocator's lock.

use tracing::{debug, warn};

use super::allocator::{AllocationGuard, OffsetAllocator};
use super::placement::TxRegion;
use crate::bundle::decode_bundle_item;
use crate::codec::{b64_decode, parse_u64};
use crate::config::MAX_CHUNK_SIZE;
use crate::crypto::merkle::prepare_chunks;
use crate::error::{SeedError, SeedResult};
use crate::resolve::ContentResolver;
use crate::storage::SeedDB;
use crate::transaction::{
    verify_chunk, verify_transaction, Chunk, Transaction, TransactionMeta, TxOffset, VerifiedChunk,
};

pub struct SeedingService {
    db: SeedDB,
    allocator: OffsetAllocator,
}

impl SeedingService {
    pub fn new(db: SeedDB) -> Self {
        let allocator = OffsetAllocator::new(db.clone());
        Self { db, allocator }
    }

    pub fn db(&self) -> &SeedDB {
        &self.db
    }

    pub fn allocator(&self) -> &OffsetAllocator {
        &self.allocator
    }

    /// A read-side resolver over the same store.
    pub fn resolver(&self) -> ContentResolver {
        ContentResolver::new(self.db.clone())
    }

    // -- Writes -------------------------------------------------------------

    /// Accept a signed transaction.
    ///
    /// Verifies the transaction (and its inline chunk, if it carries one)
    /// before anything is written. Metadata is stored outside the
    /// submission lock; the offset allocation and the inline chunk are
    /// written inside it. A transaction id that is already stored fails
    /// with [`SeedError::AlreadyExists`].
    pub fn submit_tx(&self, tx: &Transaction) -> SeedResult<()> {
        verify_transaction(tx).map_err(|e| {
            warn!(tx = %tx.id, error = %e, "rejected transaction");
            SeedError::from(e)
        })?;

        let data_size = parse_u64("data_size", &tx.data_size)?;
        let data_root = b64_decode("data_root", &tx.data_root)?;
        let inline = self.prepare_inline_chunk(tx, data_size)?;

        if self.db.has_tx_meta(&tx.id)? {
            return Err(SeedError::AlreadyExists(tx.id.clone()));
        }
        self.db.save_tx_meta(&TransactionMeta::from(tx))?;

        let guard = self.allocator.lock();
        let end_offset = guard.allocate(&data_root, data_size)?;
        if let Some((chunk, verified)) = inline {
            self.store_chunk(&guard, end_offset, &chunk, &verified)?;
        }
        drop(guard);

        debug!(tx = %tx.id, data_size, end_offset, "accepted transaction");
        Ok(())
    }

    /// Accept one chunk of a transaction's payload.
    ///
    /// Returns the chunk's absolute start offset. A chunk that fails
    /// verification leaves no trace, not even an allocation.
    pub fn submit_chunk(&self, chunk: &Chunk) -> SeedResult<u64> {
        let verified = verify_chunk(chunk).map_err(|e| {
            warn!(
                data_root = %chunk.data_root,
                offset = %chunk.offset,
                error = %e,
                "rejected chunk"
            );
            SeedError::from(e)
        })?;

        let guard = self.allocator.lock();
        let end_offset = guard.allocate(&verified.data_root, verified.data_size)?;
        let start = self.store_chunk(&guard, end_offset, chunk, &verified)?;
        drop(guard);

        debug!(
            data_root = %chunk.data_root,
            relative_offset = verified.offset,
            absolute_start = start,
            "accepted chunk"
        );
        Ok(start)
    }

    /// Accept a binary bundled item and store it under its id.
    ///
    /// Returns the item id. Only items whose signature this node can check
    /// are accepted.
    pub fn submit_bundle_item(&self, binary: &[u8]) -> SeedResult<String> {
        let item = decode_bundle_item(binary)?;
        item.verify().map_err(|e| {
            warn!(item = %item.id, error = %e, "rejected bundled item");
            SeedError::from(e)
        })?;

        if self.db.has_bundle_item(&item.id)? {
            return Err(SeedError::AlreadyExists(item.id));
        }
        self.db.save_bundle_item(&item.id, binary)?;

        debug!(item = %item.id, size = binary.len(), "accepted bundled item");
        Ok(item.id)
    }

    /// Split inline data into its single chunk and verify it.
    ///
    /// Payloads larger than one chunk are not chunked here and must be
    /// uploaded separately; `None` is returned for them and for
    /// transactions without inline data.
    fn prepare_inline_chunk(
        &self,
        tx: &Transaction,
        data_size: u64,
    ) -> SeedResult<Option<(Chunk, VerifiedChunk)>> {
        if !tx.has_inline_data() {
            return Ok(None);
        }
        if data_size > MAX_CHUNK_SIZE {
            debug!(tx = %tx.id, data_size, "inline data exceeds one chunk, expecting chunk uploads");
            return Ok(None);
        }

        let data = b64_decode("data", &tx.data)?;
        if data.len() as u64 != data_size {
            return Err(SeedError::MalformedInput(format!(
                "inline data is {} bytes but data_size is {data_size}",
                data.len()
            )));
        }

        let prepared = prepare_chunks(&data)
            .ok_or_else(|| SeedError::MalformedInput("inline data is empty".into()))?;
        if prepared.len() != 1 {
            return Err(SeedError::MalformedInput(format!(
                "inline data of {} must form exactly one chunk, got {}",
                tx.id,
                prepared.len()
            )));
        }

        let chunk = Chunk::from_prepared(&tx.data_root, &tx.data_size, &prepared, 0, &data)
            .ok_or_else(|| SeedError::MalformedInput("inline data has no chunk".into()))?;
        let verified = verify_chunk(&chunk).map_err(|e| {
            warn!(tx = %tx.id, error = %e, "inline data does not match data root");
            SeedError::from(e)
        })?;
        Ok(Some((chunk, verified)))
    }

    /// Persist a verified chunk at its absolute start offset.
    ///
    /// Taking the guard ties placement to the critical section that
    /// produced `end_offset`.
    fn store_chunk(
        &self,
        _guard: &AllocationGuard<'_>,
        end_offset: u64,
        chunk: &Chunk,
        verified: &VerifiedChunk,
    ) -> SeedResult<u64> {
        let region = TxRegion::new(end_offset, verified.data_size);
        let start = region
            .chunk_start(verified.offset, verified.len())
            .ok_or_else(|| {
                SeedError::MalformedInput(format!(
                    "chunk of {} bytes at relative offset {} does not fit a {} byte region",
                    verified.len(),
                    verified.offset,
                    verified.data_size
                ))
            })?;

        self.db.save_chunk(start, chunk).map_err(|e| {
            warn!(absolute_start = start, error = %e, "failed to store chunk");
            SeedError::from(e)
        })?;
        Ok(start)
    }

    // -- Reads --------------------------------------------------------------

    pub fn tx_meta(&self, id: &str) -> SeedResult<TransactionMeta> {
        self.db
            .load_tx_meta(id)?
            .ok_or_else(|| SeedError::NotFoundLocally(id.to_string()))
    }

    /// Where a known transaction's data lives: its end offset and size.
    pub fn tx_offset(&self, id: &str) -> SeedResult<TxOffset> {
        let meta = self.tx_meta(id)?;
        let data_size = meta.data_size()?;
        let data_root = b64_decode("data_root", &meta.data_root)?;
        let offset = self
            .allocator
            .tx_end_offset(&data_root, data_size)?
            .ok_or_else(|| SeedError::NotFoundLocally(id.to_string()))?;
        Ok(TxOffset {
            offset,
            size: data_size,
        })
    }

    /// The chunk stored at an absolute start offset.
    pub fn chunk_at_offset(&self, offset: u64) -> SeedResult<Chunk> {
        self.db
            .load_chunk(offset)?
            .ok_or_else(|| SeedError::NotFoundLocally(format!("chunk at offset {offset}")))
    }

    /// The global end offset.
    pub fn end_offset(&self) -> SeedResult<u64> {
        Ok(self.allocator.end_offset()?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
