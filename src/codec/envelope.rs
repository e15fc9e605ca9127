//! Value envelope
//!
//! Encoding and decoding of the meta-plus-payload record format.
//!
//! ## Wire Format
//! ```text
//! ┌──────────┬──────────────┬──────────────┬─────────────────────┐
//! │ Flag (1) │ MetaLen (4)  │  Meta bytes  │   Inline payload    │
//! └──────────┴──────────────┴──────────────┴─────────────────────┘
//! ```
//! `MetaLen` and `Meta bytes` are present only when `Flag == FLAG_META`.

use crate::error::{ArchiveError, Result};

use super::Meta;

/// Entry stored without metadata
pub const FLAG_PLAIN: u8 = 0x00;

/// Entry carrying a `Meta` record
pub const FLAG_META: u8 = 0x01;

/// Size of the big-endian meta length field
pub const META_LEN_SIZE: usize = 4;

/// A decoded entry, borrowing its payload from the stored bytes
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<'a> {
    pub meta: Option<Meta>,
    pub payload: &'a [u8],
}

// =============================================================================
// Encoding
// =============================================================================

/// Wrap `payload` (and optional `meta`) into a stored record
///
/// Format: flag (1) [+ meta_len (4) + meta] + payload
pub fn encode(meta: Option<&Meta>, payload: &[u8]) -> Result<Vec<u8>> {
    let meta = match meta {
        None => {
            let mut record = Vec::with_capacity(1 + payload.len());
            record.push(FLAG_PLAIN);
            record.extend_from_slice(payload);
            return Ok(record);
        }
        Some(meta) => meta.to_bytes()?,
    };

    let meta_len = u32::try_from(meta.len()).map_err(|_| {
        ArchiveError::InvalidArgument(format!("meta too large: {} bytes", meta.len()))
    })?;

    let mut record = Vec::with_capacity(1 + META_LEN_SIZE + meta.len() + payload.len());
    record.push(FLAG_META);
    record.extend_from_slice(&meta_len.to_be_bytes());
    record.extend_from_slice(&meta);
    record.extend_from_slice(payload);

    Ok(record)
}

// =============================================================================
// Decoding
// =============================================================================

/// Split a stored record into its meta and payload
///
/// Truncated input (missing flag, missing length, or a declared meta length
/// running past the end of the record) is a decode error.
pub fn decode(bytes: &[u8]) -> Result<Envelope<'_>> {
    let (&flag, rest) = bytes
        .split_first()
        .ok_or_else(|| ArchiveError::Decode("empty record".to_string()))?;

    match flag {
        FLAG_PLAIN => Ok(Envelope {
            meta: None,
            payload: rest,
        }),
        FLAG_META => {
            if rest.len() < META_LEN_SIZE {
                return Err(ArchiveError::Decode(format!(
                    "incomplete meta length: expected {} bytes, got {}",
                    META_LEN_SIZE,
                    rest.len()
                )));
            }

            let meta_len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
            let body = &rest[META_LEN_SIZE..];

            if body.len() < meta_len {
                return Err(ArchiveError::Decode(format!(
                    "incomplete meta: expected {} bytes, got {}",
                    meta_len,
                    body.len()
                )));
            }

            let meta = Meta::from_bytes(&body[..meta_len])?;
            Ok(Envelope {
                meta: Some(meta),
                payload: &body[meta_len..],
            })
        }
        _ => Err(ArchiveError::Decode(format!(
            "unknown record flag: 0x{:02x}",
            flag
        ))),
    }
}
