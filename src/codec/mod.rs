//! Codec Module
//!
//! Streaming encoder and decoder for the backup envelope.
//!
//! ## Responsibilities
//! - Serialize a lazy sequence of entries in a single pass
//! - SHA-256 checksum over the entry stream for corruption detection
//! - Bounded field lengths on both sides
//! - Replay an envelope into a callback, verifying framing and checksum
//!
//! ## Envelope Format
//! ```text
//! ┌──────┬──────────────────────────────────────────────┬──────────────┐
//! │ 0x82 │ EntryStream                                  │ Checksum     │
//! │      │ ┌──────┬───────────────────────────┬──────┐  │ ┌──────────┐ │
//! │      │ │ 0x9f │ Entry*                    │ 0xff │  │ │0x58 0x20 │ │
//! │      │ │      │ ┌──────┬───────┬───────┐  │      │  │ │ 32 bytes │ │
//! │      │ │      │ │ 0x82 │ bstr  │ bstr  │  │      │  │ └──────────┘ │
//! │      │ │      │ │      │ (key) │(value)│  │      │  │              │
//! │      │ │      │ └──────┴───────┴───────┘  │      │  │              │
//! │      │ └──────┴───────────────────────────┴──────┘  │              │
//! └──────┴──────────────────────────────────────────────┴──────────────┘
//!          ◄──────────── SHA-256 domain ──────────────►
//! ```
//!
//! Byte strings use a major-type/length header (major type 2) followed by
//! the raw bytes. Lengths are big-endian and always minimally encoded, so a
//! given entry sequence has exactly one envelope.

mod decode;
mod encode;
mod hashing;
mod header;

use std::fmt;

pub use decode::{read_backup, verify_backup, RestoreSummary};
pub use encode::{write_backup, BackupSummary};
pub use hashing::{HashingReader, HashingWriter};
pub use header::{read_byte_string, write_header, MajorType, MAX_HEADER_SIZE};

// =============================================================================
// Envelope Constants
// =============================================================================

/// Header of a definite-length array with two elements
pub const ARRAY_2: u8 = 0x82;

/// Start of an indefinite-length array
pub const INDEF_ARRAY_START: u8 = 0x9f;

/// Break marker closing an indefinite-length array
pub const ARRAY_BREAK: u8 = 0xff;

/// Size of the SHA-256 checksum in bytes
pub const CHECKSUM_SIZE: usize = 32;

/// The part of the envelope being processed, used as error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Outer two-element container header
    ArrayHeader,
    /// Indefinite-length array start of the entry stream
    StreamStart,
    /// Two-element header opening each entry
    TupleHeader,
    Key,
    Value,
    /// Break closing the entry stream
    StreamBreak,
    Checksum,
    /// Final flush of the sink
    Flush,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::ArrayHeader => "array header",
            Field::StreamStart => "entry stream header",
            Field::TupleHeader => "tuple header",
            Field::Key => "key",
            Field::Value => "value",
            Field::StreamBreak => "entry stream break",
            Field::Checksum => "checksum",
            Field::Flush => "flush",
        };
        f.write_str(name)
    }
}
