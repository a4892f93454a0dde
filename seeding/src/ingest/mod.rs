//! # Ingestion
//!
//! ```text
//! allocator.rs: OffsetAllocator: submission lock + atomic end-offset allocation
//! placement.rs: TxRegion: relative chunk offset -> absolute start offset
//! service.rs  : SeedingService: submit_tx, submit_chunk, submit_bundle_item, reads
//! ```
//!
//! Data flow for a write:
//!
//! ```text
//! submit → verify → lock → allocate (once per data root + size) → place → persist
//! ```

pub mod allocator;
pub mod placement;
pub mod service;

pub use allocator::{AllocationGuard, OffsetAllocator};
pub use placement::TxRegion;
pub use service::SeedingService;
