//! Engine Module
//!
//! The handle on the embedded ordered key-value store.
//!
//! ## Responsibilities
//! - Open/create the engine file under the configured data directory
//! - Snapshot-isolated reads (`view`) and atomic write transactions (`update`)
//! - Ordered, prefix-bounded scans in both directions
//! - The sequence counter behind `put_val`
//! - Flush and compaction
//!
//! Nothing above this module touches `redb` directly, so the engine can be
//! swapped as long as these primitives are preserved.
//!
//! ## Concurrency Model
//!
//! - **Reads**: every `view()` pins a read snapshot; readers never block
//!   each other or writers.
//! - **Writes**: `update()` runs a closure inside one write transaction.
//!   The engine admits a single writer at a time, which is what makes the
//!   read-modify-write in `Tx::next_sequence` atomic without extra locks.
//! - **Compaction**: needs exclusive access to the database handle, hence
//!   the `RwLock`. Transactions only hold the read side while they begin.

use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use redb::{
    Durability, ReadOnlyTable, ReadTransaction, ReadableTable, Table, TableDefinition,
};
use tracing::{info, warn, Span};

use crate::config::{Config, SyncMode};
use crate::error::{ArchiveError, Result};
use crate::keys;

/// Single table holding every namespace, bucket, chunk and metadata record
const DATA: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("archive");

type DataTable<'txn> = Table<'txn, &'static [u8], &'static [u8]>;

/// The engine handle shared by the database, its namespaces and buckets
pub struct Engine {
    /// Engine database (write side taken only by compaction)
    db: RwLock<redb::Database>,

    /// Path of the engine file
    path: PathBuf,

    /// Reject every write transaction
    read_only: bool,

    /// Durability of ordinary commits
    sync_mode: SyncMode,

    span: Span,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const DB_FILENAME: &'static str = "archive.redb";

    /// Open or create the engine file for the given config
    ///
    /// 1. Create the data directory (read-write only)
    /// 2. Open/create the engine file
    /// 3. Make sure the data table exists so snapshots can always open it
    pub fn open(config: &Config, span: &Span) -> Result<Self> {
        let path = config.data_dir.join(Self::DB_FILENAME);

        let mut builder = redb::Builder::new();
        builder.set_cache_size(config.cache_size);

        let db = if config.read_only {
            if !path.exists() {
                return Err(ArchiveError::NotFound(format!(
                    "no store at {}",
                    path.display()
                )));
            }
            builder.open(&path)?
        } else {
            fs::create_dir_all(&config.data_dir)?;
            let db = builder.create(&path)?;

            let txn = db.begin_write()?;
            txn.open_table(DATA)?;
            txn.commit()?;
            db
        };

        info!(
            parent: span,
            path = %path.display(),
            read_only = config.read_only,
            "engine opened"
        );

        Ok(Self {
            db: RwLock::new(db),
            path,
            read_only: config.read_only,
            sync_mode: config.sync_mode,
            span: span.clone(),
        })
    }

    /// Open a read snapshot
    pub(crate) fn view(&self) -> Result<Snapshot> {
        let txn = self.db.read().begin_read()?;
        let table = txn.open_table(DATA)?;
        Ok(Snapshot { table, _txn: txn })
    }

    /// Run `f` inside one write transaction
    ///
    /// Commits when `f` returns `Ok`, aborts (nothing written) when it
    /// returns `Err`.
    pub(crate) fn update<T>(&self, f: impl FnOnce(&mut Tx<'_>) -> Result<T>) -> Result<T> {
        if self.read_only {
            return Err(ArchiveError::ReadOnly);
        }

        let mut txn = self.db.read().begin_write()?;
        txn.set_durability(self.durability());

        let result = {
            let table = txn.open_table(DATA)?;
            let mut tx = Tx { table };
            f(&mut tx)
        };

        match result {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.abort()?;
                Err(e)
            }
        }
    }

    /// Force everything committed so far to disk
    pub fn flush(&self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }
        let mut txn = self.db.read().begin_write()?;
        txn.set_durability(Durability::Immediate);
        txn.commit()?;
        Ok(())
    }

    /// Flush, then try to compact the engine file
    ///
    /// Compaction needs the store to be quiescent. While read snapshots
    /// (e.g. live iterators) exist it is skipped with a warning; the flush
    /// still happens.
    pub fn compact(&self) -> Result<()> {
        if self.read_only {
            return Err(ArchiveError::ReadOnly);
        }
        self.flush()?;

        let mut db = self.db.write();
        match db.compact() {
            Ok(compacted) => {
                info!(parent: &self.span, compacted, "compaction finished");
                Ok(())
            }
            Err(redb::CompactionError::TransactionInProgress) => {
                warn!(
                    parent: &self.span,
                    "compaction skipped: transactions in progress"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the store was opened read-only
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Path of the engine file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn durability(&self) -> Durability {
        match self.sync_mode {
            SyncMode::Immediate => Durability::Immediate,
            SyncMode::Eventual => Durability::Eventual,
        }
    }
}

// =============================================================================
// Read Snapshot
// =============================================================================

/// A point-in-time, read-only view of the store
///
/// Holding one pins the engine's read transaction; drop it as soon as
/// possible.
pub(crate) struct Snapshot {
    table: ReadOnlyTable<&'static [u8], &'static [u8]>,
    _txn: ReadTransaction,
}

impl Snapshot {
    pub(crate) fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.table.get(key)?.map(|v| v.value().to_vec()))
    }

    /// Ordered scan over every key starting with `prefix`
    pub(crate) fn scan(&self, prefix: &[u8], reverse: bool) -> Result<Scan> {
        let upper = keys::prefix_successor(prefix);
        let range = self.table.range::<&[u8]>(prefix_bounds(prefix, upper.as_deref()))?;
        Ok(Scan { range, reverse })
    }
}

/// Cursor produced by `Snapshot::scan`
pub(crate) struct Scan {
    range: redb::Range<'static, &'static [u8], &'static [u8]>,
    reverse: bool,
}

impl Iterator for Scan {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = if self.reverse {
            self.range.next_back()
        } else {
            self.range.next()
        }?;

        Some(
            item.map(|(k, v)| (k.value().to_vec(), v.value().to_vec()))
                .map_err(ArchiveError::from),
        )
    }
}

// =============================================================================
// Write Transaction
// =============================================================================

/// Operations available inside `Engine::update`
pub(crate) struct Tx<'txn> {
    table: DataTable<'txn>,
}

impl Tx<'_> {
    pub(crate) fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.table.get(key)?.map(|v| v.value().to_vec()))
    }

    pub(crate) fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.table.insert(key, value)?;
        Ok(())
    }

    /// Remove a key; returns whether it existed
    pub(crate) fn delete(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.table.remove(key)?.is_some())
    }

    /// Every entry whose key starts with `prefix`, in key order
    pub(crate) fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let upper = keys::prefix_successor(prefix);
        let mut entries = Vec::new();
        for item in self.table.range::<&[u8]>(prefix_bounds(prefix, upper.as_deref()))? {
            let (k, v) = item?;
            entries.push((k.value().to_vec(), v.value().to_vec()));
        }
        Ok(entries)
    }

    /// Remove every key starting with `prefix`; returns how many were removed
    pub(crate) fn delete_prefix(&mut self, prefix: &[u8]) -> Result<usize> {
        let upper = keys::prefix_successor(prefix);
        let mut doomed = Vec::new();
        for item in self.table.range::<&[u8]>(prefix_bounds(prefix, upper.as_deref()))? {
            let (k, _) = item?;
            doomed.push(k.value().to_vec());
        }

        for key in &doomed {
            self.table.remove(key.as_slice())?;
        }
        Ok(doomed.len())
    }

    /// Hand out the next value of the counter stored at `key`
    ///
    /// The first call returns 0.
    pub(crate) fn next_sequence(&mut self, key: &[u8]) -> Result<u64> {
        let current = match self.get(key)? {
            Some(raw) => keys::decode_sequence(&raw)?,
            None => 0,
        };
        let next = current.checked_add(1).ok_or_else(|| {
            ArchiveError::InvalidArgument("sequence counter exhausted".to_string())
        })?;
        self.set(key, &keys::encode_sequence(next))?;
        Ok(current)
    }
}

fn prefix_bounds<'a>(prefix: &'a [u8], upper: Option<&'a [u8]>) -> (Bound<&'a [u8]>, Bound<&'a [u8]>) {
    let end = match upper {
        Some(upper) => Bound::Excluded(upper),
        None => Bound::Unbounded,
    };
    (Bound::Included(prefix), end)
}
