//! Configuration for archivedb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use tracing::Span;

/// Main configuration for an archivedb instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the store
    /// Internal structure:
    ///   {data_dir}/
    ///     └── archive.redb     (engine file: data, chunks and metadata)
    pub data_dir: PathBuf,

    /// Open an existing store without write access
    pub read_only: bool,

    // -------------------------------------------------------------------------
    // Engine Configuration
    // -------------------------------------------------------------------------
    /// Durability applied to every write transaction
    pub sync_mode: SyncMode,

    /// Engine page cache size (in bytes)
    pub cache_size: usize,

    // -------------------------------------------------------------------------
    // Logging
    // -------------------------------------------------------------------------
    /// Parent span for every event the database emits.
    /// `None` creates an `archivedb` span on open.
    pub span: Option<Span>,
}

/// Commit durability strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// fsync on every commit (safest, slowest)
    Immediate,

    /// Commits become durable with the next immediate commit or `compact()`
    Eventual,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./archivedb_data"),
            read_only: false,
            sync_mode: SyncMode::Immediate,
            cache_size: 64 * 1024 * 1024, // 64 MB
            span: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Open the store read-only
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.config.read_only = read_only;
        self
    }

    /// Set the commit durability
    pub fn sync_mode(mut self, mode: SyncMode) -> Self {
        self.config.sync_mode = mode;
        self
    }

    /// Set the engine cache size (in bytes)
    pub fn cache_size(mut self, bytes: usize) -> Self {
        self.config.cache_size = bytes;
        self
    }

    /// Inject the span all database events are recorded under
    pub fn span(mut self, span: Span) -> Self {
        self.config.span = Some(span);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
