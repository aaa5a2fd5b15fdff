//! Envelope decoder

use std::io::Read;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::Key;

use super::header::{read_byte_string, read_u8};
use super::{Field, HashingReader, ARRAY_2, ARRAY_BREAK, CHECKSUM_SIZE, INDEF_ARRAY_START};

/// Outcome of a verified restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Entries handed to the callback
    pub entries: u64,
    /// Verified SHA-256 over the entry stream
    pub checksum: [u8; CHECKSUM_SIZE],
}

/// Replay an envelope from `reader`, calling `callback` for every entry
///
/// Entries are delivered in stream order as soon as they are decoded, so
/// the callback sees them before the checksum has been checked. A restore
/// is only trustworthy once this returns `Ok`; on any error everything the
/// callback received must be discarded.
///
/// An `Err` from the callback stops the restore immediately and is
/// returned unchanged; the checksum is not read in that case.
pub fn read_backup<R, F>(mut reader: R, config: &Config, mut callback: F) -> Result<RestoreSummary>
where
    R: Read,
    F: FnMut(Key, Bytes) -> Result<()>,
{
    config.validate()?;

    expect_byte(&mut reader, Field::ArrayHeader, ARRAY_2)?;

    let mut hreader = HashingReader::new(&mut reader);

    expect_byte(&mut hreader, Field::StreamStart, INDEF_ARRAY_START)?;

    let mut entries: u64 = 0;
    loop {
        let header = read_u8(&mut hreader, Field::TupleHeader)?;
        if header == ARRAY_BREAK {
            break;
        }
        if header != ARRAY_2 {
            return Err(Error::Format {
                field: Field::TupleHeader,
                expected: ARRAY_2,
                found: header,
            });
        }

        let key = read_byte_string(&mut hreader, Field::Key, config.max_field_size)?;
        let value = read_byte_string(&mut hreader, Field::Value, config.max_field_size)?;

        callback(Key::from(key), Bytes::from(value))?;
        entries += 1;
    }

    let stream_bytes = hreader.bytes_read();
    let (reader, computed) = hreader.finish();

    // The stored checksum is read straight from the source, outside the digest
    let expected = read_byte_string(reader, Field::Checksum, CHECKSUM_SIZE as u64)?;

    if expected.as_slice() != computed.as_slice() {
        let expected = hex::encode(&expected);
        let computed = hex::encode(computed);
        tracing::warn!(%expected, %computed, "Backup checksum mismatch");
        return Err(Error::ChecksumMismatch { expected, computed });
    }

    tracing::debug!(entries, stream_bytes, "Backup stream verified");

    Ok(RestoreSummary {
        entries,
        checksum: computed,
    })
}

/// Decode and verify an envelope without doing anything with its entries
pub fn verify_backup<R: Read>(reader: R, config: &Config) -> Result<RestoreSummary> {
    read_backup(reader, config, |_, _| Ok(()))
}

fn expect_byte<R: Read>(reader: &mut R, field: Field, expected: u8) -> Result<()> {
    let found = read_u8(reader, field)?;
    if found != expected {
        return Err(Error::Format {
            field,
            expected,
            found,
        });
    }
    Ok(())
}
