//! Error types for kvsnap
//!
//! Provides a unified error type for backup, restore and store operations.

use thiserror::Error;

use crate::codec::Field;

/// Result type alias using Error
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for kvsnap operations
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    /// Reading from the source or writing to the sink failed
    #[error("{field}: {source}")]
    Io {
        field: Field,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Envelope Errors
    // -------------------------------------------------------------------------
    #[error("{field}: expected header byte 0x{expected:02x}, got 0x{found:02x}")]
    Format { field: Field, expected: u8, found: u8 },

    #[error("{field}: invalid header: {reason}")]
    InvalidHeader { field: Field, reason: String },

    #[error("{field}: length {len} exceeds maximum of {max} bytes")]
    FieldTooLarge { field: Field, len: u64, max: u64 },

    #[error("checksum didn't match; expected {expected}, got {computed}")]
    ChecksumMismatch { expected: String, computed: String },

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// A call into the underlying store failed
    #[error("{op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Store is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Control Errors
    // -------------------------------------------------------------------------
    #[error("Backup cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an error returned by the underlying store with the operation name
    pub fn store(op: &'static str, source: Error) -> Self {
        Error::Store {
            op,
            source: Box::new(source),
        }
    }

    pub(crate) fn io(field: Field) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Error::Io { field, source }
    }

    /// True when the error means the envelope itself is damaged
    /// (bad framing, bad lengths, truncation or checksum failure)
    pub fn is_corruption(&self) -> bool {
        match self {
            Error::Format { .. }
            | Error::InvalidHeader { .. }
            | Error::FieldTooLarge { .. }
            | Error::ChecksumMismatch { .. } => true,
            Error::Io { source, .. } => source.kind() == std::io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}
