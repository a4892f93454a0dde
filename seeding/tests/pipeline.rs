//! End-to-end tests for the seeding pipeline.
//!
//! Each test opens its own temporary database and drives the public API:
//! build and sign uploads, submit transactions and chunks, then read the
//! content back through the resolver and manifests.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use permaseed::bundle::BundleItemBuilder;
use permaseed::codec::b64_decode;
use permaseed::config::MANIFEST_CONTENT_TYPE;
use permaseed::crypto::keys::OwnerKeypair;
use permaseed::ingest::TxRegion;
use permaseed::storage::{DbError, SeedDB};
use permaseed::transaction::{BuiltTransaction, TransactionBuilder};
use permaseed::{ContentSource, OffsetAllocator, SeedError, SeedingService};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn service() -> SeedingService {
    SeedingService::new(SeedDB::open_temporary().expect("temp db"))
}

fn keypair(seed: u8) -> OwnerKeypair {
    OwnerKeypair::from_seed(&[seed; 32])
}

/// A signed upload whose payload is `len` bytes of a seed-dependent pattern.
fn upload(seed: u8, len: usize, content_type: &str) -> BuiltTransaction {
    let data: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(31) ^ seed).collect();
    TransactionBuilder::new()
        .data(data)
        .tag("Content-Type", content_type)
        .without_inline_data()
        .build(&keypair(seed))
        .expect("build upload")
}

/// A signed transaction carrying `body` inline.
fn inline_tx(seed: u8, body: &[u8], content_type: &str) -> BuiltTransaction {
    TransactionBuilder::new()
        .data(body.to_vec())
        .tag("Content-Type", content_type)
        .build(&keypair(seed))
        .expect("build inline tx")
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[test]
fn allocation_is_idempotent_and_counter_advances_once() {
    let allocator = OffsetAllocator::new(SeedDB::open_temporary().unwrap());
    let root = [7u8; 32];

    let first = allocator.allocate(&root, 4096).unwrap();
    let second = allocator.allocate(&root, 4096).unwrap();

    assert_eq!(first, second);
    assert_eq!(allocator.end_offset().unwrap(), 4096);
}

#[test]
fn counter_equals_sum_of_distinct_allocations() {
    let allocator = OffsetAllocator::new(SeedDB::open_temporary().unwrap());
    let sizes: Vec<u64> = vec![1, 262_144, 33, 0, 999_999];

    let mut previous = allocator.end_offset().unwrap();
    for (i, size) in sizes.iter().enumerate() {
        allocator.allocate(&[i as u8 + 1; 32], *size).unwrap();
        let now = allocator.end_offset().unwrap();
        assert!(now >= previous);
        previous = now;
    }
    assert_eq!(previous, sizes.iter().sum::<u64>());
}

#[test]
fn placement_matches_reference_example() {
    let region = TxRegion::new(1000, 100);
    assert_eq!(region.start_offset(), Some(901));
    assert_eq!(region.chunk_start(50, 20), Some(931));
}

#[test]
fn aborted_mapping_write_leaves_counter_unchanged() {
    let db = SeedDB::open_temporary().unwrap();
    db.commit_tx_data_end_offset(&[1u8; 32], 500).unwrap();

    // A second commit stages the counter bump, then fails on the mapping.
    let err = db.commit_tx_data_end_offset(&[1u8; 32], 500).unwrap_err();
    assert!(matches!(err, DbError::AlreadyAllocated { .. }));
    assert_eq!(db.load_all_data_end_offset().unwrap(), 500);
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[test]
fn duplicate_submission_is_rejected_and_metadata_kept() {
    let svc = service();
    let built = inline_tx(1, b"first and only", "text/plain");

    svc.submit_tx(&built.tx).unwrap();
    let stored = svc.tx_meta(&built.tx.id).unwrap();

    let err = svc.submit_tx(&built.tx).unwrap_err();
    assert!(matches!(err, SeedError::AlreadyExists(_)));
    assert_eq!(svc.tx_meta(&built.tx.id).unwrap(), stored);
}

#[test]
fn chunked_upload_round_trips_through_resolver() {
    let svc = service();
    let built = upload(2, 900 * 1024, "application/octet-stream");
    let expected: Vec<u8> = built
        .chunks
        .iter()
        .flat_map(|c| b64_decode("chunk", &c.chunk).unwrap())
        .collect();

    svc.submit_tx(&built.tx).unwrap();
    for chunk in &built.chunks {
        svc.submit_chunk(chunk).unwrap();
    }

    let offset = svc.tx_offset(&built.tx.id).unwrap();
    assert_eq!(offset.size, 900 * 1024);
    assert_eq!(offset.offset, 900 * 1024);

    let content = svc.resolver().resolve(&built.tx.id).unwrap();
    assert_eq!(content.source, ContentSource::Transaction);
    assert_eq!(content.data, expected);
    assert_eq!(content.content_type(), Some("application/octet-stream"));
}

#[test]
fn chunks_are_readable_by_absolute_offset() {
    let svc = service();
    let a = inline_tx(3, b"aaaa", "text/plain");
    let b = upload(4, 300 * 1024, "text/plain");

    svc.submit_tx(&a.tx).unwrap();
    svc.submit_tx(&b.tx).unwrap();
    let starts: Vec<u64> = b.chunks.iter().map(|c| svc.submit_chunk(c).unwrap()).collect();

    // b's region begins where a's ends.
    assert_eq!(starts[0], 4);
    let chunk = svc.chunk_at_offset(starts[1]).unwrap();
    assert_eq!(chunk, b.chunks[1]);
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[test]
fn manifest_resolution_end_to_end() {
    let svc = service();
    let index = inline_tx(5, b"<h1>home</h1>", "text/html");
    let nested = inline_tx(6, b"<h1>a</h1>", "text/html");
    svc.submit_tx(&index.tx).unwrap();
    svc.submit_tx(&nested.tx).unwrap();

    let manifest = format!(
        r#"{{"manifest":"arweave/paths","version":"0.1.0","index":{{"path":"index.html"}},"paths":{{"index.html":{{"txId":"{}"}},"a/index.html":{{"txId":"{}"}}}}}}"#,
        index.tx.id, nested.tx.id
    );
    let resolver = svc.resolver();

    let home = resolver.resolve_manifest(manifest.as_bytes(), "").unwrap();
    assert_eq!(home.id, index.tx.id);
    assert_eq!(home.data, b"<h1>home</h1>");

    let dir = resolver.resolve_manifest(manifest.as_bytes(), "a/").unwrap();
    assert_eq!(dir.id, nested.tx.id);

    let missing = resolver.resolve_manifest(manifest.as_bytes(), "missing");
    assert!(matches!(missing, Err(SeedError::PageNotFound(_))));
}

#[test]
fn stored_manifest_serves_paths() {
    let svc = service();
    let page = inline_tx(7, b"page body", "text/html");
    svc.submit_tx(&page.tx).unwrap();

    let manifest = format!(
        r#"{{"manifest":"arweave/paths","version":"0.1.0","index":{{"path":"index.html"}},"paths":{{"index.html":{{"txId":"{}"}}}}}}"#,
        page.tx.id
    );
    let manifest_tx = inline_tx(8, manifest.as_bytes(), MANIFEST_CONTENT_TYPE);
    svc.submit_tx(&manifest_tx.tx).unwrap();

    let resolver = svc.resolver();
    let content = resolver.resolve_path(&manifest_tx.tx.id, "").unwrap();
    assert_eq!(content.data, b"page body");
    assert!(matches!(
        resolver.resolve_path(&manifest_tx.tx.id, "nope.html"),
        Err(SeedError::PageNotFound(_))
    ));
}

#[test]
fn resolver_falls_back_to_bundle_items_then_local_miss() {
    let svc = service();
    let item = BundleItemBuilder::new()
        .tag("Content-Type", "text/plain")
        .data(b"bundled".to_vec())
        .sign(&keypair(9));
    let id = svc.submit_bundle_item(&item).unwrap();

    let resolver = svc.resolver();
    let content = resolver.resolve(&id).unwrap();
    assert_eq!(content.source, ContentSource::BundleItem);
    assert_eq!(content.data, b"bundled");

    let err = resolver.resolve("absent-everywhere").unwrap_err();
    assert!(err.is_not_found_locally());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_chunk_submissions_get_disjoint_regions() {
    let svc = Arc::new(service());
    let uploads: Vec<BuiltTransaction> = (0..16u8)
        .map(|i| upload(i + 20, 1_000 + i as usize * 17, "application/octet-stream"))
        .collect();

    let handles: Vec<_> = uploads
        .iter()
        .cloned()
        .map(|built| {
            let svc = Arc::clone(&svc);
            thread::spawn(move || {
                let chunk = &built.chunks[0];
                let start = svc.submit_chunk(chunk).expect("chunk accepted");
                let len = b64_decode("chunk", &chunk.chunk).unwrap().len() as u64;
                (start, start + len)
            })
        })
        .collect();

    let mut ranges: Vec<(u64, u64)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ranges.sort();
    for pair in ranges.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "overlapping ranges {pair:?}");
    }

    let total: u64 = uploads.iter().map(|u| u.tx.data_size.parse::<u64>().unwrap()).sum();
    assert_eq!(svc.end_offset().unwrap(), total);
    assert_eq!(ranges.last().unwrap().1, total);
}

#[test]
fn concurrent_submissions_of_one_payload_share_one_region() {
    let svc = Arc::new(service());
    let built = upload(40, 5_000, "text/plain");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let svc = Arc::clone(&svc);
            let chunk = built.chunks[0].clone();
            thread::spawn(move || svc.submit_chunk(&chunk).unwrap())
        })
        .collect();

    let starts: HashSet<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(svc.end_offset().unwrap(), 5_000);
}
