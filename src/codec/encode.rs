//! Envelope encoder

use std::io::Write;

use crate::cancel::Cancellation;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::Entry;

use super::header::{write_header, MajorType};
use super::{Field, HashingWriter, ARRAY_2, ARRAY_BREAK, CHECKSUM_SIZE, INDEF_ARRAY_START};

/// Outcome of a successful backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    /// Entries written to the envelope
    pub entries: u64,
    /// Total envelope size, checksum included
    pub bytes_written: u64,
    /// SHA-256 over the entry stream
    pub checksum: [u8; CHECKSUM_SIZE],
}

/// Write `entries` to `out` as a checksummed envelope
///
/// Entries are written in the order they are yielded and only the current
/// one is held in memory. The first error (from the sink, from the entry
/// source, an oversized field or cancellation) aborts the write; whatever
/// reached `out` by then is not a valid backup.
pub fn write_backup<W, I>(
    mut out: W,
    entries: I,
    config: &Config,
    cancel: &Cancellation,
) -> Result<BackupSummary>
where
    W: Write,
    I: IntoIterator<Item = Result<Entry>>,
{
    config.validate()?;

    // Outer header stays out of the checksum
    out.write_all(&[ARRAY_2])
        .map_err(Error::io(Field::ArrayHeader))?;

    let mut hout = HashingWriter::new(&mut out);

    hout.write_all(&[INDEF_ARRAY_START])
        .map_err(Error::io(Field::StreamStart))?;

    let mut count: u64 = 0;
    let mut entries = entries.into_iter();

    loop {
        if cancel.is_cancelled() {
            tracing::info!(entries = count, "Backup cancelled");
            return Err(Error::Cancelled);
        }

        let entry = match entries.next() {
            Some(entry) => entry.map_err(|e| Error::store("query next", e))?,
            None => break,
        };

        write_entry(&mut hout, &entry, config.max_field_size)?;
        count += 1;

        if config.progress_interval > 0 && count % config.progress_interval == 0 {
            tracing::debug!(
                entries = count,
                bytes = hout.bytes_written(),
                "Backup progress"
            );
        }
    }

    hout.write_all(&[ARRAY_BREAK])
        .map_err(Error::io(Field::StreamBreak))?;

    let stream_bytes = hout.bytes_written();
    let (out, checksum) = hout.finish();

    write_header(out, MajorType::ByteString, CHECKSUM_SIZE as u64)
        .map_err(Error::io(Field::Checksum))?;
    out.write_all(&checksum)
        .map_err(Error::io(Field::Checksum))?;
    out.flush().map_err(Error::io(Field::Flush))?;

    // 0x82 + stream + 0x58 0x20 + digest
    let bytes_written = 1 + stream_bytes + 2 + CHECKSUM_SIZE as u64;

    Ok(BackupSummary {
        entries: count,
        bytes_written,
        checksum,
    })
}

/// Write one `[key, value]` tuple
fn write_entry<W: Write>(out: &mut W, entry: &Entry, max: u64) -> Result<()> {
    let key = entry.key.as_bytes();
    let value = entry.value.as_ref();

    // Reject before anything of this entry reaches the sink
    check_size(Field::Key, key.len(), max)?;
    check_size(Field::Value, value.len(), max)?;

    out.write_all(&[ARRAY_2])
        .map_err(Error::io(Field::TupleHeader))?;

    write_header(out, MajorType::ByteString, key.len() as u64)
        .map_err(Error::io(Field::Key))?;
    out.write_all(key).map_err(Error::io(Field::Key))?;

    write_header(out, MajorType::ByteString, value.len() as u64)
        .map_err(Error::io(Field::Value))?;
    out.write_all(value).map_err(Error::io(Field::Value))?;

    Ok(())
}

fn check_size(field: Field, len: usize, max: u64) -> Result<()> {
    let len = len as u64;
    if len > max {
        return Err(Error::FieldTooLarge { field, len, max });
    }
    Ok(())
}
