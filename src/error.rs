//! Error types for archivedb
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ArchiveError
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Unified error type for archivedb operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Database is opened read-only")]
    ReadOnly,

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Engine / I/O Errors
    // -------------------------------------------------------------------------
    #[error("Engine error: {0}")]
    Engine(#[from] redb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// True for a missing key, bucket or namespace
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArchiveError::NotFound(_))
    }
}

// The engine reports failures through one error type per phase; all of them
// collapse into `redb::Error` and surface unchanged as `ArchiveError::Engine`.
macro_rules! engine_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for ArchiveError {
                fn from(e: $source) -> Self {
                    ArchiveError::Engine(e.into())
                }
            }
        )*
    };
}

engine_error!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
    redb::CompactionError,
);
