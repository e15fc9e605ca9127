//! # archivedb
//!
//! An embedded archive store built on an ordered, transactional key-value
//! engine:
//! - Namespaces isolating the data of one tenant or collection
//! - Document buckets for structured records
//! - Binary-object buckets with metadata and transparent chunking
//! - Ranged reads into chunked values without reassembly
//! - Generated monotonic keys, ordered iteration over snapshots
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Database                             │
//! │                 (namespace registry, Mutex)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Namespace                             │
//! │        DocBucket "d" · object "o" · chunks "t" · user        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Bucket    │─────────►│ Value codec │
//!   │ (+Iterator) │          │ (envelope)  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │   Engine    │
//!   │   (redb)    │
//!   └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use archivedb::{Bucket, Database, Meta};
//!
//! # fn main() -> archivedb::Result<()> {
//! let db = Database::open_path("./data")?;
//! let ns = db.create_namespace(b"media")?;
//! let objects = ns.object_bucket();
//!
//! objects.put(b"a", b"hello world", Some(Meta::new("text/plain").with_chunk_size(4)))?;
//! let (value, meta) = objects.get(b"a")?;
//! assert_eq!(value, b"hello world");
//! assert_eq!(meta.map(|m| m.chunks.len()), Some(3));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod keys;

pub mod codec;
pub mod bucket;
pub mod iterator;
pub mod namespace;
pub mod database;

mod catalog;
mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ArchiveError, Result};
pub use config::{Config, SyncMode};
pub use database::Database;
pub use namespace::{Namespace, Resource};
pub use bucket::{Bucket, DocBucket, DocumentStore, KvBucket};
pub use iterator::{BucketIterator, DocIterator, IterState};
pub use codec::{Document, Meta, Query, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of archivedb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
