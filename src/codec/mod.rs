//! Codec Module
//!
//! Byte formats owned by archivedb.
//!
//! ## Value Envelope
//!
//! Every bucket entry is stored wrapped in an envelope:
//!
//! ```text
//! ┌──────────┬──────────────┬──────────────┬─────────────────────┐
//! │ Flag (1) │ MetaLen (4)  │  Meta bytes  │   Inline payload    │
//! └──────────┴──────────────┴──────────────┴─────────────────────┘
//!   0 = no meta: MetaLen and Meta are absent
//!   1 = meta:    MetaLen is big-endian; payload is empty when chunked
//! ```
//!
//! ## Documents
//!
//! Documents are `Value` trees encoded with bincode. `Meta` uses the same
//! encoding.

mod document;
mod envelope;
mod meta;

pub use document::{decode_document, encode_document, Document, Query, Value, MAX_DEPTH};
pub use envelope::{decode, encode, Envelope, FLAG_META, FLAG_PLAIN, META_LEN_SIZE};
pub use meta::Meta;
