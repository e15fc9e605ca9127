//! Iterator Module
//!
//! Cursors over the entries of one bucket.
//!
//! ## Lifecycle
//! ```text
//!   Unstarted ──advance()──► Positioned ──advance()──► ... ──► Exhausted
//!       │                                                          ▲
//!       └────────────────── advance() on an empty bucket ─────────┘
//! ```
//! The first `advance()` seeks to the bucket's entry prefix (from the top of
//! the prefix range when iterating in reverse). `key()`, `value()` and
//! `meta()` are only valid while `Positioned`.
//!
//! An iterator pins an engine read snapshot for its whole lifetime. Call
//! `release()` (or drop it) as soon as the scan is done.

use std::sync::Arc;

use tracing::{trace, Span};

use crate::bucket::KvBucket;
use crate::codec::{self, decode_document, Document, Meta};
use crate::engine::{Scan, Snapshot};
use crate::error::{ArchiveError, Result};

/// Cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    Unstarted,
    Positioned,
    Exhausted,
}

/// Cursor over a bucket's entries, in key order (or reverse key order)
pub struct BucketIterator {
    // Declared before `snapshot` so the cursor is released first
    scan: Option<Scan>,
    snapshot: Snapshot,

    /// Entry prefix of the bucket; stripped from returned keys
    prefix: Vec<u8>,
    reverse: bool,

    /// Chunk bucket used to reassemble chunked values
    chunks: Option<Arc<KvBucket>>,

    state: IterState,
    current: Option<(Vec<u8>, Vec<u8>)>,
    span: Span,
}

impl BucketIterator {
    pub(crate) fn new(
        snapshot: Snapshot,
        prefix: Vec<u8>,
        reverse: bool,
        chunks: Option<Arc<KvBucket>>,
        span: Span,
    ) -> Self {
        Self {
            scan: None,
            snapshot,
            prefix,
            reverse,
            chunks,
            state: IterState::Unstarted,
            current: None,
            span,
        }
    }

    pub fn state(&self) -> IterState {
        self.state
    }

    /// Move to the next entry; returns false once the bucket is exhausted
    pub fn advance(&mut self) -> Result<bool> {
        match self.state {
            IterState::Exhausted => return Ok(false),
            IterState::Unstarted => {
                self.scan = Some(self.snapshot.scan(&self.prefix, self.reverse)?);
            }
            IterState::Positioned => {}
        }

        let next = match self.scan.as_mut().and_then(|scan| scan.next()).transpose() {
            Ok(next) => next,
            Err(e) => {
                self.exhaust();
                return Err(e);
            }
        };

        match next {
            Some(entry) if entry.0.starts_with(&self.prefix) => {
                self.current = Some(entry);
                self.state = IterState::Positioned;
                Ok(true)
            }
            _ => {
                self.exhaust();
                Ok(false)
            }
        }
    }

    /// Caller key of the current entry
    pub fn key(&self) -> Result<&[u8]> {
        let (key, _) = self.positioned()?;
        Ok(&key[self.prefix.len()..])
    }

    /// Payload of the current entry, reassembled if chunked
    pub fn value(&self) -> Result<Vec<u8>> {
        let (_, record) = self.positioned()?;
        let envelope = codec::decode(record)?;
        match envelope.meta {
            Some(meta) if meta.is_chunked() => self.join(&meta),
            _ => Ok(envelope.payload.to_vec()),
        }
    }

    /// Meta of the current entry
    pub fn meta(&self) -> Result<Option<Meta>> {
        let (_, record) = self.positioned()?;
        Ok(codec::decode(record)?.meta)
    }

    /// Close the cursor and its read snapshot
    pub fn release(self) -> Result<()> {
        trace!(parent: &self.span, state = ?self.state, "iterator released");
        drop(self);
        Ok(())
    }

    fn positioned(&self) -> Result<&(Vec<u8>, Vec<u8>)> {
        match (self.state, &self.current) {
            (IterState::Positioned, Some(entry)) => Ok(entry),
            (state, _) => Err(ArchiveError::InvalidArgument(format!(
                "iterator is not positioned ({:?})",
                state
            ))),
        }
    }

    fn join(&self, meta: &Meta) -> Result<Vec<u8>> {
        let chunks = self.chunks.as_deref().ok_or_else(|| {
            ArchiveError::Decode("entry references chunks outside a namespace".to_string())
        })?;
        chunks.join_chunks(&self.snapshot, meta)
    }

    fn exhaust(&mut self) {
        self.state = IterState::Exhausted;
        self.current = None;
        // Drop the cursor early; the snapshot stays until release
        self.scan = None;
    }
}

/// Cursor over a document bucket
pub struct DocIterator {
    inner: BucketIterator,
}

impl DocIterator {
    pub(crate) fn new(inner: BucketIterator) -> Self {
        Self { inner }
    }

    pub fn state(&self) -> IterState {
        self.inner.state()
    }

    pub fn advance(&mut self) -> Result<bool> {
        self.inner.advance()
    }

    pub fn key(&self) -> Result<&[u8]> {
        self.inner.key()
    }

    pub fn value(&self) -> Result<Vec<u8>> {
        self.inner.value()
    }

    pub fn meta(&self) -> Result<Option<Meta>> {
        self.inner.meta()
    }

    /// Decode the current entry as a document
    pub fn value_doc(&self) -> Result<Document> {
        decode_document(&self.inner.value()?)
    }

    pub fn release(self) -> Result<()> {
        self.inner.release()
    }
}
