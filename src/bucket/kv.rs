//! Generic bucket
//!
//! Byte values under caller keys, with optional meta and chunking.

use std::sync::Arc;

use tracing::{debug, debug_span, warn, Span};

use crate::codec::{self, Envelope, Meta};
use crate::engine::{Engine, Snapshot, Tx};
use crate::error::{ArchiveError, Result};
use crate::iterator::BucketIterator;
use crate::keys::{self, BucketKind};

use super::Bucket;

/// A prefix-scoped bucket
///
/// `chunks` points at the namespace's shared chunk bucket; it is `None` for
/// the chunk bucket itself, which therefore only accepts inline values.
pub struct KvBucket {
    name: Vec<u8>,
    kind: BucketKind,

    /// `<namespace>[kind][len][name]`: everything the bucket owns
    prefix: Vec<u8>,

    /// `<prefix>[ENTRY]`: caller entries only
    entry_prefix: Vec<u8>,

    /// `<prefix>[META]id`: `put_val` counter
    sequence_key: Vec<u8>,

    engine: Arc<Engine>,
    chunks: Option<Arc<KvBucket>>,
    span: Span,
}

impl KvBucket {
    pub(crate) fn new(
        engine: Arc<Engine>,
        namespace_prefix: &[u8],
        kind: BucketKind,
        name: &[u8],
        chunks: Option<Arc<KvBucket>>,
        parent: &Span,
    ) -> Self {
        let prefix = keys::bucket_prefix(namespace_prefix, kind, name);
        let span = debug_span!(parent: parent, "bucket", name = %keys::display(name));

        Self {
            name: name.to_vec(),
            kind,
            entry_prefix: keys::entry_prefix(&prefix),
            sequence_key: keys::sequence_key(&prefix),
            prefix,
            engine,
            chunks,
            span,
        }
    }

    /// Bucket name
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Builtin or user bucket
    pub fn kind(&self) -> BucketKind {
        self.kind
    }

    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    fn entry_key(&self, key: &[u8]) -> Vec<u8> {
        keys::entry_key(&self.entry_prefix, key)
    }

    fn chunk_store(&self) -> Result<&KvBucket> {
        self.chunks.as_deref().ok_or_else(|| {
            ArchiveError::InvalidArgument(format!(
                "bucket {} cannot hold chunked values",
                keys::display(&self.name)
            ))
        })
    }

    fn not_found(&self, key: &[u8]) -> ArchiveError {
        ArchiveError::NotFound(format!(
            "key {:?} in bucket {}",
            keys::display(key),
            keys::display(&self.name)
        ))
    }

    // =========================================================================
    // Write Path (inside a transaction)
    // =========================================================================

    pub(crate) fn put_in(
        &self,
        tx: &mut Tx<'_>,
        key: &[u8],
        value: &[u8],
        meta: Option<Meta>,
    ) -> Result<()> {
        let entry_key = self.entry_key(key);

        let record = match meta {
            None => codec::encode(None, value)?,
            Some(mut meta) => {
                let split = meta.split_size()?;
                meta.total_len = value.len() as u64;
                meta.chunks.clear();

                match split {
                    Some(size) if size < value.len() => {
                        let chunks = self.chunk_store()?;
                        for piece in value.chunks(size) {
                            let chunk_key = chunks.put_val_in(tx, piece, None)?;
                            meta.chunks.push(chunk_key);
                        }
                        debug!(
                            parent: &self.span,
                            total_len = meta.total_len,
                            chunks = meta.chunks.len(),
                            "stored chunked value"
                        );
                        codec::encode(Some(&meta), &[])?
                    }
                    _ => codec::encode(Some(&meta), value)?,
                }
            }
        };

        // An overwritten chunked value takes its chunks with it
        self.release_chunks(tx, &entry_key)?;
        tx.set(&entry_key, &record)
    }

    pub(crate) fn put_val_in(
        &self,
        tx: &mut Tx<'_>,
        value: &[u8],
        meta: Option<Meta>,
    ) -> Result<Vec<u8>> {
        let seq = tx.next_sequence(&self.sequence_key)?;
        let key = keys::encode_sequence(seq).to_vec();
        self.put_in(tx, &key, value, meta)?;
        Ok(key)
    }

    /// Remove an entry and its chunks; returns whether the entry existed
    pub(crate) fn delete_in(&self, tx: &mut Tx<'_>, key: &[u8]) -> Result<bool> {
        let entry_key = self.entry_key(key);
        let released = self.release_chunks(tx, &entry_key)?;
        let existed = tx.delete(&entry_key)?;
        if existed {
            debug!(parent: &self.span, released, "deleted entry");
        }
        Ok(existed)
    }

    /// Remove every entry, referenced chunk and the counter of this bucket
    pub(crate) fn clear_in(&self, tx: &mut Tx<'_>) -> Result<usize> {
        let mut released = 0;
        if let Some(chunks) = self.chunks.as_deref() {
            for (_, record) in tx.scan(&self.entry_prefix)? {
                for chunk_key in self.chunk_refs(&record) {
                    // Chunks already gone are fine during teardown
                    if tx.delete(&chunks.entry_key(&chunk_key))? {
                        released += 1;
                    }
                }
            }
        }

        let removed = tx.delete_prefix(&self.prefix)?;
        debug!(parent: &self.span, removed, released, "bucket cleared");
        Ok(removed)
    }

    fn release_chunks(&self, tx: &mut Tx<'_>, entry_key: &[u8]) -> Result<usize> {
        let Some(record) = tx.get(entry_key)? else {
            return Ok(0);
        };
        let refs = self.chunk_refs(&record);
        if refs.is_empty() {
            return Ok(0);
        }

        let chunks = self.chunk_store()?;
        let mut released = 0;
        for chunk_key in &refs {
            if tx.delete(&chunks.entry_key(chunk_key))? {
                released += 1;
            }
        }
        Ok(released)
    }

    fn chunk_refs(&self, record: &[u8]) -> Vec<Vec<u8>> {
        match codec::decode(record) {
            Ok(envelope) => envelope.meta.map(|m| m.chunks).unwrap_or_default(),
            Err(e) => {
                warn!(parent: &self.span, error = %e, "unreadable record, chunks left in place");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Read Path (inside a snapshot)
    // =========================================================================

    fn record(&self, snapshot: &Snapshot, key: &[u8]) -> Result<Vec<u8>> {
        snapshot
            .get(&self.entry_key(key))?
            .ok_or_else(|| self.not_found(key))
    }

    /// Concatenate the chunks listed in `meta` (called on the chunk bucket)
    pub(crate) fn join_chunks(&self, snapshot: &Snapshot, meta: &Meta) -> Result<Vec<u8>> {
        let (total_len, _) = chunk_layout(meta)?;
        let mut value = Vec::with_capacity(total_len.min(MAX_PREALLOC));
        for chunk_key in &meta.chunks {
            value.extend_from_slice(&self.read_chunk(snapshot, chunk_key)?);
        }

        if value.len() as u64 != meta.total_len {
            return Err(ArchiveError::Decode(format!(
                "chunked value is {} bytes, meta says {}",
                value.len(),
                meta.total_len
            )));
        }
        Ok(value)
    }

    /// Copy from a chunked value starting at `offset` (called on the chunk bucket)
    ///
    /// Only the chunks overlapping `[offset, offset + buf.len())` are read.
    pub(crate) fn read_chunks_at(
        &self,
        snapshot: &Snapshot,
        meta: &Meta,
        buf: &mut [u8],
        offset: usize,
    ) -> Result<usize> {
        let (total_len, chunk_size) = chunk_layout(meta)?;
        if offset > total_len {
            return Err(ArchiveError::InvalidArgument(format!(
                "offset {} out of range for {} byte value",
                offset, total_len
            )));
        }

        let mut index = offset / chunk_size;
        let mut skip = offset % chunk_size;
        let mut copied = 0;

        while copied < buf.len() && index < meta.chunks.len() {
            let chunk = self.read_chunk(snapshot, &meta.chunks[index])?;
            let available = chunk.get(skip..).ok_or_else(|| {
                ArchiveError::Decode(format!(
                    "chunk {} is {} bytes, expected at least {}",
                    index,
                    chunk.len(),
                    skip
                ))
            })?;

            let n = available.len().min(buf.len() - copied);
            buf[copied..copied + n].copy_from_slice(&available[..n]);

            copied += n;
            skip = 0;
            index += 1;
        }

        Ok(copied)
    }

    fn read_chunk(&self, snapshot: &Snapshot, chunk_key: &[u8]) -> Result<Vec<u8>> {
        let record = snapshot.get(&self.entry_key(chunk_key))?.ok_or_else(|| {
            ArchiveError::NotFound(format!("chunk {:02x?} is missing", chunk_key))
        })?;
        Ok(codec::decode(&record)?.payload.to_vec())
    }
}

impl Bucket for KvBucket {
    fn put(&self, key: &[u8], value: &[u8], meta: Option<Meta>) -> Result<()> {
        self.engine.update(|tx| self.put_in(tx, key, value, meta))
    }

    fn put_val(&self, value: &[u8], meta: Option<Meta>) -> Result<Vec<u8>> {
        self.engine.update(|tx| self.put_val_in(tx, value, meta))
    }

    fn get(&self, key: &[u8]) -> Result<(Vec<u8>, Option<Meta>)> {
        let snapshot = self.engine.view()?;
        let record = self.record(&snapshot, key)?;
        let Envelope { meta, payload } = codec::decode(&record)?;

        match meta {
            Some(meta) if meta.is_chunked() => {
                let value = self.chunk_store()?.join_chunks(&snapshot, &meta)?;
                Ok((value, Some(meta)))
            }
            meta => Ok((payload.to_vec(), meta)),
        }
    }

    fn get_at(&self, key: &[u8], buf: &mut [u8], offset: usize) -> Result<usize> {
        let snapshot = self.engine.view()?;
        let record = self.record(&snapshot, key)?;
        let Envelope { meta, payload } = codec::decode(&record)?;

        if let Some(meta) = meta.filter(Meta::is_chunked) {
            return self
                .chunk_store()?
                .read_chunks_at(&snapshot, &meta, buf, offset);
        }

        if offset >= payload.len() {
            return Err(ArchiveError::InvalidArgument(format!(
                "offset {} out of range for {} byte value",
                offset,
                payload.len()
            )));
        }

        let n = buf.len().min(payload.len() - offset);
        buf[..n].copy_from_slice(&payload[offset..offset + n]);
        Ok(n)
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Meta>> {
        let snapshot = self.engine.view()?;
        let record = self.record(&snapshot, key)?;
        Ok(codec::decode(&record)?.meta)
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.engine.view()?.get(&self.entry_key(key))?.is_some())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.engine.update(|tx| self.delete_in(tx, key))?;
        Ok(())
    }

    fn range(
        &self,
        begin: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
    ) -> Result<BucketIterator> {
        ensure_full_range("range", begin, end)?;
        Ok(BucketIterator::new(
            self.engine.view()?,
            self.entry_prefix.clone(),
            reverse,
            self.chunks.clone(),
            self.span.clone(),
        ))
    }

    fn count(&self, begin: Option<&[u8]>, end: Option<&[u8]>) -> Result<usize> {
        ensure_full_range("count", begin, end)?;
        let snapshot = self.engine.view()?;
        let mut count = 0;
        for entry in snapshot.scan(&self.entry_prefix, false)? {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}

/// Upper bound on the buffer reserved up front when joining chunks
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Total length and chunk size of a chunked value, checked against its
/// chunk list
///
/// `n` chunks of `size` bytes hold more than `(n - 1) * size` and at most
/// `n * size` bytes; anything else is a corrupt record.
fn chunk_layout(meta: &Meta) -> Result<(usize, usize)> {
    let chunk_size = match meta.split_size() {
        Ok(Some(size)) => size,
        _ => {
            return Err(ArchiveError::Decode(format!(
                "chunked value with invalid chunk size {}",
                meta.chunk_size
            )))
        }
    };

    let count = meta.chunks.len() as u64;
    let size = chunk_size as u64;
    let min = count.saturating_sub(1).saturating_mul(size);
    let max = count.saturating_mul(size);
    if meta.total_len <= min || meta.total_len > max {
        return Err(ArchiveError::Decode(format!(
            "meta says {} bytes, {} chunks of {} bytes hold {}..={}",
            meta.total_len,
            count,
            size,
            min.saturating_add(1),
            max
        )));
    }

    let total_len = usize::try_from(meta.total_len).map_err(|_| {
        ArchiveError::Decode(format!("chunked value of {} bytes", meta.total_len))
    })?;
    Ok((total_len, chunk_size))
}

/// Bounded ranges are not implemented; refuse them instead of ignoring bounds
fn ensure_full_range(op: &str, begin: Option<&[u8]>, end: Option<&[u8]>) -> Result<()> {
    if begin.is_some() || end.is_some() {
        return Err(ArchiveError::Unsupported(format!(
            "{} over a bounded key range",
            op
        )));
    }
    Ok(())
}
