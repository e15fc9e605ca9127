//! Meta record
//!
//! Describes a stored binary value: its mime type, how it is chunked and
//! where the chunks live.

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

/// Metadata attached to a stored value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    // -------------------------------------------------------------------------
    // Inputs
    // -------------------------------------------------------------------------
    /// Mime type, e.g. `image/jpeg`
    pub mime: String,

    /// Chunk size in bytes; 0 stores the value inline
    pub chunk_size: i64,

    // -------------------------------------------------------------------------
    // Outputs (filled in by `put`)
    // -------------------------------------------------------------------------
    /// Value length in bytes
    pub total_len: u64,

    /// Keys of the chunks in the namespace chunk bucket, in value order
    pub chunks: Vec<Vec<u8>>,
}

impl Meta {
    /// Meta for an inline value of the given mime type
    pub fn new(mime: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            ..Self::default()
        }
    }

    /// Split values longer than `size` bytes into chunks
    pub fn with_chunk_size(mut self, size: i64) -> Self {
        self.chunk_size = size;
        self
    }

    /// Whether the payload lives in the chunk bucket
    pub fn is_chunked(&self) -> bool {
        !self.chunks.is_empty()
    }

    /// Chunk size to split a value by, or `None` to store it inline
    pub(crate) fn split_size(&self) -> Result<Option<usize>> {
        match self.chunk_size {
            0 => Ok(None),
            n if n < 0 => Err(ArchiveError::InvalidArgument(format!(
                "invalid chunk size {}",
                n
            ))),
            n => usize::try_from(n).map(Some).map_err(|_| {
                ArchiveError::InvalidArgument(format!("chunk size {} out of range", n))
            }),
        }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| ArchiveError::InvalidArgument(format!("failed to encode meta: {}", e)))
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| ArchiveError::Decode(format!("failed to decode meta: {}", e)))
    }
}
