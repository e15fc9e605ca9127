//! Key Layout
//!
//! Every record of every namespace lives in one ordered keyspace. Isolation
//! comes purely from key prefixes, so this module is the single place that
//! knows how they are built.
//!
//! ## Layout
//! ```text
//! Database meta:   [DB_META]   "namespaces"
//! Namespace:       [DB_DATA]   [len:u8][ns name]
//!   ├── meta:      <ns>        [NS_META] "buckets"
//!   └── bucket:    <ns>        [kind:u8] [len:u8][bucket name]
//!        ├── entry:    <bucket> [ENTRY] caller key
//!        └── sequence: <bucket> [META]  "id"
//! ```
//!
//! Names are length-prefixed, so two distinct namespaces (or two buckets of
//! the same kind) never produce prefixes where one is a prefix of the other.

use crate::error::{ArchiveError, Result};

// =============================================================================
// Markers
// =============================================================================

/// Top-level marker for namespace data
pub(crate) const DB_DATA: u8 = 0x00;

/// Top-level marker for database metadata
pub(crate) const DB_META: u8 = 0x01;

/// Namespace-level marker for namespace metadata
pub(crate) const NS_META: u8 = 0x02;

/// Bucket-level marker for caller entries
pub(crate) const BUCKET_ENTRY: u8 = 0x00;

/// Bucket-level marker for internal bucket metadata (sequence counter)
pub(crate) const BUCKET_META: u8 = 0x01;

const NAMESPACE_LIST_KEY: &[u8] = b"namespaces";
const BUCKET_LIST_KEY: &[u8] = b"buckets";
const SEQUENCE_KEY: &[u8] = b"id";

/// Builtin bucket holding documents
pub const DOC_BUCKET_NAME: &[u8] = b"d";

/// Builtin bucket holding binary objects
pub const OBJECT_BUCKET_NAME: &[u8] = b"o";

/// Builtin bucket holding the chunks of every oversized value in a namespace
pub const CHUNK_BUCKET_NAME: &[u8] = b"t";

/// Maximum namespace/bucket name length in bytes
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Width of keys generated by `put_val`
pub const SEQUENCE_KEY_LEN: usize = 8;

/// Which family a bucket belongs to inside its namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BucketKind {
    /// Document, object and chunk buckets created with the namespace
    Builtin = 0x00,

    /// Buckets created through `Namespace::create_bucket`
    User = 0x01,
}

// =============================================================================
// Builders
// =============================================================================

/// Reject names that cannot be length-prefixed
pub fn validate_name(what: &str, name: &[u8]) -> Result<()> {
    if name.is_empty() {
        return Err(ArchiveError::InvalidArgument(format!(
            "{} name cannot be empty",
            what
        )));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ArchiveError::InvalidArgument(format!(
            "{} name is {} bytes (max {})",
            what,
            name.len(),
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn push_name(key: &mut Vec<u8>, name: &[u8]) {
    debug_assert!(name.len() <= MAX_NAME_LEN);
    key.push(name.len() as u8);
    key.extend_from_slice(name);
}

/// Key holding the persisted namespace-name list
pub fn namespace_list_key() -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + NAMESPACE_LIST_KEY.len());
    key.push(DB_META);
    key.extend_from_slice(NAMESPACE_LIST_KEY);
    key
}

/// `[DB_DATA][len][name]`
pub fn namespace_prefix(name: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + name.len());
    key.push(DB_DATA);
    push_name(&mut key, name);
    key
}

/// Key holding a namespace's persisted user-bucket list
pub fn bucket_list_key(namespace_prefix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(namespace_prefix.len() + 1 + BUCKET_LIST_KEY.len());
    key.extend_from_slice(namespace_prefix);
    key.push(NS_META);
    key.extend_from_slice(BUCKET_LIST_KEY);
    key
}

/// `<ns>[kind][len][name]`
pub fn bucket_prefix(namespace_prefix: &[u8], kind: BucketKind, name: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(namespace_prefix.len() + 2 + name.len());
    key.extend_from_slice(namespace_prefix);
    key.push(kind as u8);
    push_name(&mut key, name);
    key
}

/// Prefix shared by every caller entry of a bucket
pub fn entry_prefix(bucket_prefix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(bucket_prefix.len() + 1);
    key.extend_from_slice(bucket_prefix);
    key.push(BUCKET_ENTRY);
    key
}

/// Full engine key of a caller entry
pub fn entry_key(entry_prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut full = Vec::with_capacity(entry_prefix.len() + key.len());
    full.extend_from_slice(entry_prefix);
    full.extend_from_slice(key);
    full
}

/// Key of a bucket's `put_val` counter
pub fn sequence_key(bucket_prefix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(bucket_prefix.len() + 1 + SEQUENCE_KEY.len());
    key.extend_from_slice(bucket_prefix);
    key.push(BUCKET_META);
    key.extend_from_slice(SEQUENCE_KEY);
    key
}

/// Fixed-width big-endian encoding of a generated key
pub fn encode_sequence(n: u64) -> [u8; SEQUENCE_KEY_LEN] {
    n.to_be_bytes()
}

/// Decode a generated key (or a stored counter) back to its integer
pub fn decode_sequence(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; SEQUENCE_KEY_LEN] = bytes.try_into().map_err(|_| {
        ArchiveError::Decode(format!(
            "sequence must be {} bytes, got {}",
            SEQUENCE_KEY_LEN,
            bytes.len()
        ))
    })?;
    Ok(u64::from_be_bytes(raw))
}

/// Smallest key greater than every key starting with `prefix`.
/// `None` when the prefix is all `0xFF` (no upper bound exists).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

/// Printable form of a binary name or key for log fields and messages
pub fn display(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
