//! The offset allocator.
//!
//! Two layers keep the global address space consistent:
//!
//! - a process-wide mutex, so that no two submissions can both observe
//!   "no mapping yet" for the same `(data_root, data_size)` and both
//!   allocate;
//! - a sled transaction inside [`SeedDB::commit_tx_data_end_offset`], so
//!   the counter bump and the mapping write land together or not at all.
//!
//! Callers that must keep other writes inside the critical section (chunk
//! placement) take an [`AllocationGuard`] and hold it until they are done.

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::codec::b64_encode;
use crate::storage::{DbResult, SeedDB};

pub struct OffsetAllocator {
    db: SeedDB,
    lock: Mutex<()>,
}

impl OffsetAllocator {
    pub fn new(db: SeedDB) -> Self {
        Self {
            db,
            lock: Mutex::new(()),
        }
    }

    /// Enter the submission critical section.
    pub fn lock(&self) -> AllocationGuard<'_> {
        AllocationGuard {
            db: &self.db,
            _guard: self.lock.lock(),
        }
    }

    /// Allocate (or look up) the end offset of `(data_root, data_size)`.
    pub fn allocate(&self, data_root: &[u8], data_size: u64) -> DbResult<u64> {
        self.lock().allocate(data_root, data_size)
    }

    /// Current global end offset. Takes no lock.
    pub fn end_offset(&self) -> DbResult<u64> {
        self.db.load_all_data_end_offset()
    }

    /// Existing end offset of `(data_root, data_size)`. Takes no lock.
    pub fn tx_end_offset(&self, data_root: &[u8], data_size: u64) -> DbResult<Option<u64>> {
        self.db.load_tx_data_end_offset(data_root, data_size)
    }
}

/// Proof that the holder is inside the submission critical section.
pub struct AllocationGuard<'a> {
    db: &'a SeedDB,
    _guard: MutexGuard<'a, ()>,
}

impl AllocationGuard<'_> {
    /// Return the existing mapping, or advance the global counter by
    /// `data_size` and record the new end as this pair's mapping.
    pub fn allocate(&self, data_root: &[u8], data_size: u64) -> DbResult<u64> {
        if let Some(end) = self.db.load_tx_data_end_offset(data_root, data_size)? {
            return Ok(end);
        }

        let end = self.db.commit_tx_data_end_offset(data_root, data_size)?;
        debug!(
            data_root = %b64_encode(data_root),
            data_size,
            end_offset = end,
            "allocated transaction region"
        );
        Ok(end)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn allocator() -> OffsetAllocator {
        OffsetAllocator::new(SeedDB::open_temporary().unwrap())
    }

    #[test]
    fn allocation_is_idempotent() {
        let alloc = allocator();
        let first = alloc.allocate(&[1u8; 32], 100).unwrap();
        let second = alloc.allocate(&[1u8; 32], 100).unwrap();
        assert_eq!(first, 100);
        assert_eq!(second, first);
        assert_eq!(alloc.end_offset().unwrap(), 100);
    }

    #[test]
    fn counter_is_sum_of_distinct_sizes() {
        let alloc = allocator();
        let sizes = [10u64, 0, 262_144, 7, 1];
        let mut last = 0;
        for (i, size) in sizes.iter().enumerate() {
            let end = alloc.allocate(&[i as u8; 32], *size).unwrap();
            assert!(end >= last, "counter went backwards");
            last = end;
        }
        assert_eq!(alloc.end_offset().unwrap(), sizes.iter().sum::<u64>());
    }

    #[test]
    fn tx_end_offset_reads_without_allocating() {
        let alloc = allocator();
        assert_eq!(alloc.tx_end_offset(&[1u8; 32], 5).unwrap(), None);
        alloc.allocate(&[1u8; 32], 5).unwrap();
        assert_eq!(alloc.tx_end_offset(&[1u8; 32], 5).unwrap(), Some(5));
    }

    #[test]
    fn concurrent_first_allocations_agree() {
        let alloc = Arc::new(allocator());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let alloc = Arc::clone(&alloc);
                thread::spawn(move || alloc.allocate(&[9u8; 32], 64).unwrap())
            })
            .collect();

        let ends: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ends.iter().all(|e| *e == 64));
        assert_eq!(alloc.end_offset().unwrap(), 64);
    }
}
