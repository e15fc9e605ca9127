//! Database Module
//!
//! The top-level handle: owns the engine and the namespace registry.
//!
//! ## Restart
//! Namespace names are persisted on every `create_namespace`, but nothing is
//! registered automatically on open. After a restart call `create_namespace`
//! again for each namespace you use (`stored_namespaces` lists them), then
//! `Namespace::load_buckets` to get the user buckets back.
//!
//! `delete_namespace` wipes the stored bucket list together with the data and
//! unregisters the namespace's user buckets, so buckets created afterwards are
//! listed again.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, info_span, Span};

use crate::catalog;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{ArchiveError, Result};
use crate::keys;
use crate::namespace::Namespace;

pub struct Database {
    engine: Arc<Engine>,
    namespaces: Mutex<HashMap<Vec<u8>, Arc<Namespace>>>,
    span: Span,
}

impl Database {
    /// Open (or create) the store described by `config`
    pub fn open(config: Config) -> Result<Self> {
        let span = config
            .span
            .clone()
            .unwrap_or_else(|| info_span!("archivedb"));
        let engine = Engine::open(&config, &span)?;

        Ok(Self {
            engine: Arc::new(engine),
            namespaces: Mutex::new(HashMap::new()),
            span,
        })
    }

    /// Open a read-write store in `path` with default settings
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Config::builder().data_dir(path.as_ref()).build())
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    /// Get or create a namespace
    ///
    /// Concurrent callers with the same name all receive the same handle.
    pub fn create_namespace(&self, name: &[u8]) -> Result<Arc<Namespace>> {
        keys::validate_name("namespace", name)?;

        let mut namespaces = self.namespaces.lock();
        if let Some(ns) = namespaces.get(name) {
            return Ok(ns.clone());
        }

        if !self.engine.is_read_only() {
            let list_key = keys::namespace_list_key();
            self.engine
                .update(|tx| catalog::add_name(tx, &list_key, name))?;
        }

        let ns = Arc::new(Namespace::new(self.engine.clone(), name, &self.span));
        namespaces.insert(name.to_vec(), ns.clone());
        info!(parent: &self.span, namespace = %keys::display(name), "namespace created");
        Ok(ns)
    }

    /// Delete every key of a namespace: all its buckets, entries and chunks
    ///
    /// Fails with `NotFound` when the namespace was not created in this
    /// process. The handle stays registered and observes an empty namespace
    /// without user buckets; `create_bucket` persists their names again.
    pub fn delete_namespace(&self, name: &[u8]) -> Result<()> {
        let ns = self.namespaces.lock().get(name).cloned().ok_or_else(|| {
            ArchiveError::NotFound(format!("namespace {}", keys::display(name)))
        })?;

        let removed = ns.clear()?;
        info!(
            parent: &self.span,
            namespace = %keys::display(name),
            removed,
            "namespace deleted"
        );
        Ok(())
    }

    /// Namespace names registered in this process, sorted
    pub fn list_namespaces(&self) -> Vec<Vec<u8>> {
        let mut names: Vec<Vec<u8>> = self.namespaces.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names in the persisted namespace list, in creation order
    pub fn stored_namespaces(&self) -> Result<Vec<Vec<u8>>> {
        let snapshot = self.engine.view()?;
        catalog::read_names(&snapshot, &keys::namespace_list_key())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Flush and compact the engine file (best effort)
    pub fn compact(&self) -> Result<()> {
        self.engine.compact()
    }

    pub fn is_read_only(&self) -> bool {
        self.engine.is_read_only()
    }

    /// Path of the engine file
    pub fn path(&self) -> &Path {
        self.engine.path()
    }

    /// Flush and close the database
    ///
    /// The engine file stays open while namespace or bucket handles are
    /// still alive elsewhere.
    pub fn close(self) -> Result<()> {
        self.engine.flush()?;
        info!(parent: &self.span, "database closed");
        Ok(())
    }
}
