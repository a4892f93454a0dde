//! Chunk placement in the global address space.
//!
//! A transaction of size `S` allocated end offset `E` owns the bytes whose
//! start keys run from `E - S` up to `E`. Its first byte, under the
//! end-offset convention, is `E - S + 1`. A chunk whose relative end offset
//! is `r` and whose length is `L` ends at `start + r` and starts at
//! `start + r - L`:
//!
//! ```text
//! E = 1000, S = 100        start = 901
//! r = 50,   L = 20         chunk end = 951, chunk start = 931
//! ```
//!
//! For a well-formed upload the first chunk (`r = L - 1`) lands on `E - S`
//! and every following chunk lands where the previous one ended, so the
//! chunk keys tile `[E - S, E)` with no gaps.

/// A transaction's allocated region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxRegion {
    pub end_offset: u64,
    pub data_size: u64,
}

impl TxRegion {
    pub fn new(end_offset: u64, data_size: u64) -> Self {
        Self {
            end_offset,
            data_size,
        }
    }

    /// `E - S + 1`. `None` if the region would start below zero.
    pub fn start_offset(&self) -> Option<u64> {
        self.end_offset.checked_sub(self.data_size)?.checked_add(1)
    }

    /// Key of the first chunk, `E - S`.
    pub fn first_chunk_offset(&self) -> Option<u64> {
        self.end_offset.checked_sub(self.data_size)
    }

    /// Absolute start offset of a chunk, the key it is stored under.
    ///
    /// Returns `None` unless the chunk lies inside the region: `r` must be
    /// below the data size and the chunk must not reach back past the
    /// region's first byte.
    pub fn chunk_start(&self, relative_offset: u64, chunk_len: u64) -> Option<u64> {
        if relative_offset >= self.data_size || chunk_len > relative_offset + 1 {
            return None;
        }
        let chunk_end = self.start_offset()?.checked_add(relative_offset)?;
        chunk_end.checked_sub(chunk_len)
    }
}
