//! Bucket Module
//!
//! Ordered key-value containers scoped by a key prefix.
//!
//! ## Capabilities
//! - `Bucket`: byte values with optional `Meta`, generated keys, ranged reads,
//!   full-range iteration
//! - `DocumentStore`: a `Bucket` that also stores and scans `Document`s
//!
//! ## Implementations
//! - `KvBucket`: every user bucket, the object bucket and the chunk bucket
//! - `DocBucket`: the builtin document bucket
//!
//! ## Chunking
//! ```text
//! put(key, value, meta{chunk_size: C})   with 0 < C < len(value)
//!
//!   bucket:        <key> ─► [1][len][meta{total_len, chunks:[k0,k1,k2]}]
//!   chunk bucket:  k0 ─► value[0..C]
//!                  k1 ─► value[C..2C]
//!                  k2 ─► value[2C..]
//! ```
//! The chunk bucket is shared by every bucket of a namespace; chunk keys come
//! from its sequence counter. Chunks, their keys and the entry are written in
//! one transaction and deleted in one transaction.

mod doc;
mod kv;

pub use doc::DocBucket;
pub use kv::KvBucket;

use crate::codec::{Document, Meta, Query};
use crate::error::Result;
use crate::iterator::{BucketIterator, DocIterator};

/// Generic byte-valued bucket
pub trait Bucket: Send + Sync {
    /// Store `value` under `key`
    ///
    /// - no meta: stored inline without metadata
    /// - `meta.chunk_size == 0` or `>= value.len()`: stored inline with meta
    /// - `0 < meta.chunk_size < value.len()`: split into chunks
    /// - `meta.chunk_size < 0`: `InvalidArgument`
    fn put(&self, key: &[u8], value: &[u8], meta: Option<Meta>) -> Result<()>;

    /// Store `value` under the next generated key (8-byte big-endian counter)
    /// and return that key.
    ///
    /// Do not mix with `put` in the same bucket: a manual key can be
    /// overwritten by a generated one.
    fn put_val(&self, value: &[u8], meta: Option<Meta>) -> Result<Vec<u8>>;

    /// Fetch the whole value (reassembled if chunked) and its meta
    fn get(&self, key: &[u8]) -> Result<(Vec<u8>, Option<Meta>)>;

    /// Copy the value into `buf` starting at `offset`, without reassembling
    /// chunked values; returns the number of bytes copied.
    fn get_at(&self, key: &[u8], buf: &mut [u8], offset: usize) -> Result<usize>;

    /// Metadata of the entry, `None` when it was stored without
    fn get_meta(&self, key: &[u8]) -> Result<Option<Meta>>;

    fn exists(&self, key: &[u8]) -> Result<bool>;

    /// Remove the entry and all of its chunks; missing keys are a no-op
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Iterate the bucket. Only the full range (`None`, `None`) is supported.
    fn range(&self, begin: Option<&[u8]>, end: Option<&[u8]>, reverse: bool)
        -> Result<BucketIterator>;

    /// Count entries. Only the full range (`None`, `None`) is supported.
    fn count(&self, begin: Option<&[u8]>, end: Option<&[u8]>) -> Result<usize>;
}

/// A bucket of structured documents
pub trait DocumentStore: Bucket {
    fn put_doc(&self, key: &[u8], doc: &Document) -> Result<()>;

    fn get_doc(&self, key: &[u8]) -> Result<Document>;

    /// Scan documents, newest key first. `query` is reserved for filtering;
    /// every document is returned.
    fn find(&self, query: &Query) -> Result<DocIterator>;
}
