//! Tests for Namespace
//!
//! These tests verify:
//! - Isolation between namespaces
//! - User bucket creation, deletion and listing
//! - Persisted bucket list and reload
//! - Atomic document + objects writes

use std::sync::Arc;

use archivedb::{
    ArchiveError, Bucket, Config, Database, Document, DocumentStore, Meta, Resource, Value,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db = open_db(&temp_dir);
    (temp_dir, db)
}

fn open_db(dir: &TempDir) -> Database {
    let config = Config::builder().data_dir(dir.path()).build();
    Database::open(config).unwrap()
}

// =============================================================================
// Isolation Tests
// =============================================================================

#[test]
fn test_namespaces_are_isolated() {
    let (_temp, db) = setup_temp_db();
    let a = db.create_namespace(b"a").unwrap();
    let b = db.create_namespace(b"b").unwrap();

    a.object_bucket().put(b"key", b"from a", None).unwrap();

    assert!(!b.object_bucket().exists(b"key").unwrap());
    assert!(b.object_bucket().get(b"key").unwrap_err().is_not_found());
}

#[test]
fn test_namespace_name_prefix_does_not_leak() {
    let (_temp, db) = setup_temp_db();
    let short = db.create_namespace(b"ns").unwrap();
    let long = db.create_namespace(b"ns2").unwrap();

    long.object_bucket().put(b"k", b"v", None).unwrap();

    assert_eq!(short.object_bucket().count(None, None).unwrap(), 0);
    assert_eq!(long.object_bucket().count(None, None).unwrap(), 1);
}

#[test]
fn test_same_bucket_name_in_two_namespaces() {
    let (_temp, db) = setup_temp_db();
    let a = db.create_namespace(b"a").unwrap();
    let b = db.create_namespace(b"b").unwrap();

    let shared_a = a.create_bucket(b"shared").unwrap();
    let shared_b = b.create_bucket(b"shared").unwrap();

    shared_a.put(b"k", b"value a", None).unwrap();
    shared_b.put(b"k", b"value b", None).unwrap();

    assert_eq!(shared_a.get(b"k").unwrap().0, b"value a");
    assert_eq!(shared_b.get(b"k").unwrap().0, b"value b");
}

#[test]
fn test_builtin_buckets_are_distinct() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();

    ns.object_bucket().put(b"k", b"object", None).unwrap();

    assert!(!ns.doc_bucket().exists(b"k").unwrap());
    assert_eq!(ns.doc_bucket().name(), b"d");
    assert_eq!(ns.object_bucket().name(), b"o");
    assert_eq!(ns.chunk_bucket().name(), b"t");
}

#[test]
fn test_user_bucket_named_like_builtin() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();
    let user_o = ns.create_bucket(b"o").unwrap();

    user_o.put(b"k", b"user", None).unwrap();

    assert!(!ns.object_bucket().exists(b"k").unwrap());
}

// =============================================================================
// User Bucket Tests
// =============================================================================

#[test]
fn test_create_bucket_is_idempotent() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();

    let first = ns.create_bucket(b"b").unwrap();
    let second = ns.create_bucket(b"b").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    first.put(b"k", b"v", None).unwrap();
    assert_eq!(second.get(b"k").unwrap().0, b"v");
}

#[test]
fn test_create_bucket_rejects_bad_names() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();

    let err = ns.create_bucket(b"").err().unwrap();
    assert!(matches!(err, ArchiveError::InvalidArgument(_)));

    let err = ns.create_bucket(&[b'x'; 256]).err().unwrap();
    assert!(matches!(err, ArchiveError::InvalidArgument(_)));
}

#[test]
fn test_delete_and_recreate_bucket() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();

    let bucket = ns.create_bucket(b"b").unwrap();
    bucket.put(b"key", b"value", None).unwrap();

    ns.delete_bucket(b"b").unwrap();
    let bucket = ns.create_bucket(b"b").unwrap();

    assert!(!bucket.exists(b"key").unwrap());
}

#[test]
fn test_delete_bucket_releases_chunks_and_counter() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();
    let bucket = ns.create_bucket(b"b").unwrap();

    let meta = Meta::new("application/octet-stream").with_chunk_size(3);
    bucket.put_val(b"0123456789", Some(meta)).unwrap();
    assert_eq!(ns.chunk_bucket().count(None, None).unwrap(), 4);

    ns.delete_bucket(b"b").unwrap();

    assert_eq!(bucket.count(None, None).unwrap(), 0);
    assert_eq!(ns.chunk_bucket().count(None, None).unwrap(), 0);

    // Counter starts over
    let key = bucket.put_val(b"again", None).unwrap();
    assert_eq!(key, 0u64.to_be_bytes().to_vec());
}

#[test]
fn test_delete_unknown_bucket() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();

    assert!(ns.delete_bucket(b"never").unwrap_err().is_not_found());
}

#[test]
fn test_list_buckets_sorted() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();

    ns.create_bucket(b"zeta").unwrap();
    ns.create_bucket(b"alpha").unwrap();
    ns.create_bucket(b"mid").unwrap();

    assert_eq!(
        ns.list_buckets(),
        vec![b"alpha".to_vec(), b"mid".to_vec(), b"zeta".to_vec()]
    );
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_load_buckets_after_reopen() {
    let temp = TempDir::new().unwrap();

    {
        let db = open_db(&temp);
        let ns = db.create_namespace(b"ns").unwrap();
        ns.create_bucket(b"first").unwrap();
        ns.create_bucket(b"second")
            .unwrap()
            .put(b"k", b"kept", None)
            .unwrap();
        drop(ns);
        db.close().unwrap();
    }

    let db = open_db(&temp);
    let ns = db.create_namespace(b"ns").unwrap();
    assert!(ns.list_buckets().is_empty());
    assert_eq!(
        ns.stored_buckets().unwrap(),
        vec![b"first".to_vec(), b"second".to_vec()]
    );

    assert_eq!(ns.load_buckets().unwrap(), 2);
    assert_eq!(ns.load_buckets().unwrap(), 0);
    assert_eq!(ns.list_buckets(), vec![b"first".to_vec(), b"second".to_vec()]);

    let second = ns.create_bucket(b"second").unwrap();
    assert_eq!(second.get(b"k").unwrap().0, b"kept");
}

#[test]
fn test_deleted_bucket_stays_in_stored_list() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();

    ns.create_bucket(b"b").unwrap();
    ns.delete_bucket(b"b").unwrap();

    assert_eq!(ns.stored_buckets().unwrap(), vec![b"b".to_vec()]);
}

// =============================================================================
// Combined Write Tests
// =============================================================================

#[test]
fn test_put_doc_with_objects() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();

    let mut doc = Document::new();
    doc.insert("title".to_string(), Value::from("clip"));
    doc.insert("video".to_string(), Value::from(b"vid1".to_vec()));

    let video: Vec<u8> = (0..100u8).collect();
    let objects = vec![
        Resource::new(b"vid1".to_vec(), video.clone())
            .with_meta(Meta::new("video/mp4").with_chunk_size(30)),
        Resource::new(b"thumb1".to_vec(), b"png".to_vec()),
    ];

    ns.put_doc_with_objects(b"doc1", &doc, &objects).unwrap();

    assert_eq!(ns.doc_bucket().get_doc(b"doc1").unwrap(), doc);
    let (value, meta) = ns.object_bucket().get(b"vid1").unwrap();
    assert_eq!(value, video);
    assert_eq!(meta.unwrap().chunks.len(), 4);
    assert_eq!(ns.object_bucket().get(b"thumb1").unwrap().0, b"png");
}

#[test]
fn test_put_doc_with_objects_is_atomic() {
    let (_temp, db) = setup_temp_db();
    let ns = db.create_namespace(b"ns").unwrap();

    let mut doc = Document::new();
    doc.insert("title".to_string(), Value::from("broken"));

    let objects = vec![
        Resource::new(b"good".to_vec(), vec![1u8; 50])
            .with_meta(Meta::new("application/octet-stream").with_chunk_size(10)),
        Resource::new(b"bad".to_vec(), vec![2u8; 50])
            .with_meta(Meta::new("application/octet-stream").with_chunk_size(-5)),
    ];

    let err = ns.put_doc_with_objects(b"doc", &doc, &objects).unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidArgument(_)));

    assert!(!ns.doc_bucket().exists(b"doc").unwrap());
    assert!(!ns.object_bucket().exists(b"good").unwrap());
    assert_eq!(ns.chunk_bucket().count(None, None).unwrap(), 0);
}
