//! Tests for BucketIterator
//!
//! These tests verify:
//! - State transitions (unstarted → positioned → exhausted)
//! - Forward and reverse ordering
//! - Caller keys, values and meta of the current entry
//! - Reassembly of chunked values
//! - Snapshot isolation while iterating

use archivedb::{ArchiveError, Bucket, Config, Database, IterState, Meta};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let db = Database::open(config).unwrap();
    (temp_dir, db)
}

fn collect_keys(bucket: &dyn Bucket, reverse: bool) -> Vec<Vec<u8>> {
    let mut iter = bucket.range(None, None, reverse).unwrap();
    let mut keys = Vec::new();
    while iter.advance().unwrap() {
        keys.push(iter.key().unwrap().to_vec());
    }
    iter.release().unwrap();
    keys
}

// =============================================================================
// State Tests
// =============================================================================

#[test]
fn test_iterator_states() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();
    let bucket = ns.object_bucket();
    bucket.put(b"only", b"1", None).unwrap();

    let mut iter = bucket.range(None, None, false).unwrap();
    assert_eq!(iter.state(), IterState::Unstarted);

    assert!(iter.advance().unwrap());
    assert_eq!(iter.state(), IterState::Positioned);

    assert!(!iter.advance().unwrap());
    assert_eq!(iter.state(), IterState::Exhausted);

    // Stays exhausted
    assert!(!iter.advance().unwrap());
    iter.release().unwrap();
}

#[test]
fn test_accessors_require_position() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();
    let bucket = ns.object_bucket();
    bucket.put(b"k", b"v", None).unwrap();

    let mut iter = bucket.range(None, None, false).unwrap();
    assert!(matches!(iter.key().unwrap_err(), ArchiveError::InvalidArgument(_)));
    assert!(matches!(iter.value().unwrap_err(), ArchiveError::InvalidArgument(_)));

    while iter.advance().unwrap() {}
    assert!(matches!(iter.meta().unwrap_err(), ArchiveError::InvalidArgument(_)));
    iter.release().unwrap();
}

#[test]
fn test_empty_bucket_goes_straight_to_exhausted() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();

    for reverse in [false, true] {
        let mut iter = ns.object_bucket().range(None, None, reverse).unwrap();
        assert!(!iter.advance().unwrap());
        assert_eq!(iter.state(), IterState::Exhausted);
        iter.release().unwrap();
    }
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_forward_and_reverse_order() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();
    let bucket = ns.create_bucket(b"b").unwrap();

    let keys: [&[u8]; 5] = [b"b", b"a", b"c", b"\xff", b"\x00"];
    for key in keys {
        bucket.put(key, b"v", None).unwrap();
    }

    let forward = collect_keys(bucket.as_ref(), false);
    assert_eq!(
        forward,
        vec![b"\x00".to_vec(), b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"\xff".to_vec()]
    );

    let mut reverse = collect_keys(bucket.as_ref(), true);
    reverse.reverse();
    assert_eq!(reverse, forward);
}

#[test]
fn test_iteration_stays_inside_bucket() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();
    let before = db.create_namespace(b"m").unwrap();
    let after = db.create_namespace(b"nt").unwrap();

    before.object_bucket().put(b"x", b"v", None).unwrap();
    after.object_bucket().put(b"y", b"v", None).unwrap();
    ns.create_bucket(b"user").unwrap().put(b"z", b"v", None).unwrap();
    ns.object_bucket().put(b"mine", b"v", None).unwrap();

    for reverse in [false, true] {
        assert_eq!(
            collect_keys(ns.object_bucket().as_ref(), reverse),
            vec![b"mine".to_vec()]
        );
    }
}

#[test]
fn test_generated_keys_iterate_in_numeric_order() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();
    let bucket = ns.create_bucket(b"log").unwrap();

    let generated: Vec<Vec<u8>> = (0..300u32)
        .map(|i| bucket.put_val(&i.to_le_bytes(), None).unwrap())
        .collect();

    assert_eq!(collect_keys(bucket.as_ref(), false), generated);
}

// =============================================================================
// Value Tests
// =============================================================================

#[test]
fn test_values_and_meta() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();
    let bucket = ns.object_bucket();

    bucket.put(b"a", b"plain", None).unwrap();
    bucket
        .put(b"b", b"hello world", Some(Meta::new("text/plain").with_chunk_size(4)))
        .unwrap();

    let mut iter = bucket.range(None, None, false).unwrap();

    assert!(iter.advance().unwrap());
    assert_eq!(iter.key().unwrap(), b"a");
    assert_eq!(iter.value().unwrap(), b"plain");
    assert!(iter.meta().unwrap().is_none());

    assert!(iter.advance().unwrap());
    assert_eq!(iter.key().unwrap(), b"b");
    assert_eq!(iter.value().unwrap(), b"hello world");
    let meta = iter.meta().unwrap().unwrap();
    assert_eq!(meta.mime, "text/plain");
    assert_eq!(meta.chunks.len(), 3);

    assert!(!iter.advance().unwrap());
    iter.release().unwrap();
}

#[test]
fn test_iterator_reads_its_snapshot() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();
    let bucket = ns.object_bucket();

    bucket.put(b"a", b"old", None).unwrap();
    bucket.put(b"b", b"old", None).unwrap();

    let mut iter = bucket.range(None, None, false).unwrap();
    assert!(iter.advance().unwrap());

    // Writes after the iterator was created are not visible to it
    bucket.put(b"b", b"new", None).unwrap();
    bucket.put(b"c", b"new", None).unwrap();

    assert!(iter.advance().unwrap());
    assert_eq!(iter.key().unwrap(), b"b");
    assert_eq!(iter.value().unwrap(), b"old");
    assert!(!iter.advance().unwrap());
    iter.release().unwrap();

    assert_eq!(bucket.get(b"b").unwrap().0, b"new");
    assert_eq!(bucket.count(None, None).unwrap(), 3);
}
