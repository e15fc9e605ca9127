//! Document model and codec
//!
//! A document is a string-keyed map of `Value`s. `Value` is a closed union,
//! so a decoded document is exactly the document that was encoded: integers
//! stay integers, bytes stay bytes, nesting is preserved.

use std::cell::Cell;
use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{ArchiveError, Result};

/// A structured document, keys in sorted order
pub type Document = BTreeMap<String, Value>;

/// Filter passed to `DocumentStore::find` (currently every document matches)
pub type Query = Document;

/// A single document value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(#[serde(deserialize_with = "nested")] Vec<Value>),
    Document(#[serde(deserialize_with = "nested")] Document),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// =============================================================================
// Codec
// =============================================================================

/// Deepest list/document nesting a stored document may have
pub const MAX_DEPTH: usize = 128;

thread_local! {
    static DECODE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Current nesting level while decoding on this thread; released on drop
struct DepthGuard;

impl DepthGuard {
    fn enter() -> std::result::Result<Self, String> {
        DECODE_DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > MAX_DEPTH {
                return Err(format!("document nested deeper than {}", MAX_DEPTH));
            }
            depth.set(next);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DECODE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

fn nested<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let _guard = DepthGuard::enter().map_err(de::Error::custom)?;
    T::deserialize(deserializer)
}

/// Whether any list/document in `doc` sits deeper than `MAX_DEPTH`
fn too_deep(doc: &Document) -> bool {
    let mut pending: Vec<(&Value, usize)> = doc.values().map(|v| (v, 0)).collect();
    while let Some((value, depth)) = pending.pop() {
        let level = depth + 1;
        match value {
            Value::List(_) | Value::Document(_) if level > MAX_DEPTH => return true,
            Value::List(items) => pending.extend(items.iter().map(|child| (child, level))),
            Value::Document(inner) => pending.extend(inner.values().map(|child| (child, level))),
            _ => {}
        }
    }
    false
}

/// Serialize a document to its stored form
///
/// Documents nested deeper than `MAX_DEPTH` are rejected, since they could
/// not be read back.
pub fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    if too_deep(doc) {
        return Err(ArchiveError::InvalidArgument(format!(
            "document nested deeper than {}",
            MAX_DEPTH
        )));
    }
    bincode::serialize(doc)
        .map_err(|e| ArchiveError::InvalidArgument(format!("failed to encode document: {}", e)))
}

/// Parse a stored document
pub fn decode_document(bytes: &[u8]) -> Result<Document> {
    bincode::deserialize(bytes)
        .map_err(|e| ArchiveError::Decode(format!("failed to decode document: {}", e)))
}
