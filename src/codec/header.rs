//! Major-type headers
//!
//! Every framed item starts with a header byte: the top 3 bits hold the
//! major type and the low 5 bits either hold a small length directly or say
//! how many big-endian length bytes follow.
//!
//! ```text
//! ┌──────────────┬─────────────────────┬───────────────────────────┐
//! │ major (3 bit)│ info (5 bit)        │ following length bytes    │
//! ├──────────────┼─────────────────────┼───────────────────────────┤
//! │              │ 0..=23              │ none, info is the length  │
//! │              │ 24                  │ 1                         │
//! │              │ 25                  │ 2                         │
//! │              │ 26                  │ 4                         │
//! │              │ 27                  │ 8                         │
//! │              │ 28..=31             │ rejected                  │
//! └──────────────┴─────────────────────┴───────────────────────────┘
//! ```

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

use super::Field;

/// Largest possible header: 1 type byte + 8 length bytes
pub const MAX_HEADER_SIZE: usize = 9;

const INFO_U8: u8 = 24;
const INFO_U16: u8 = 25;
const INFO_U32: u8 = 26;
const INFO_U64: u8 = 27;
const INFO_INDEFINITE: u8 = 31;

/// Major types used by the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MajorType {
    ByteString = 2,
    Array = 4,
}

/// Encode a header into `scratch`, returning the used prefix
fn encode_header(scratch: &mut [u8; MAX_HEADER_SIZE], major: MajorType, len: u64) -> &[u8] {
    let mt = (major as u8) << 5;

    if len < INFO_U8 as u64 {
        scratch[0] = mt | len as u8;
        &scratch[..1]
    } else if len <= u8::MAX as u64 {
        scratch[0] = mt | INFO_U8;
        scratch[1] = len as u8;
        &scratch[..2]
    } else if len <= u16::MAX as u64 {
        scratch[0] = mt | INFO_U16;
        scratch[1..3].copy_from_slice(&(len as u16).to_be_bytes());
        &scratch[..3]
    } else if len <= u32::MAX as u64 {
        scratch[0] = mt | INFO_U32;
        scratch[1..5].copy_from_slice(&(len as u32).to_be_bytes());
        &scratch[..5]
    } else {
        scratch[0] = mt | INFO_U64;
        scratch[1..9].copy_from_slice(&len.to_be_bytes());
        &scratch[..9]
    }
}

/// Write a minimally encoded header for `len` items/bytes of `major` type
pub fn write_header<W: Write + ?Sized>(writer: &mut W, major: MajorType, len: u64) -> io::Result<()> {
    let mut scratch = [0u8; MAX_HEADER_SIZE];
    writer.write_all(encode_header(&mut scratch, major, len))
}

/// Read a single byte, surfacing a short read as `UnexpectedEof`
pub(crate) fn read_u8<R: Read + ?Sized>(reader: &mut R, field: Field) -> Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte).map_err(Error::io(field))?;
    Ok(byte[0])
}

/// Read a header, returning the raw major type and the length it carries
///
/// Rejects reserved and indefinite-length encodings, and lengths that were
/// not encoded in their shortest form.
pub(crate) fn read_header<R: Read + ?Sized>(reader: &mut R, field: Field) -> Result<(u8, u64)> {
    let first = read_u8(reader, field)?;
    let major = first >> 5;
    let info = first & 0x1f;

    let (len, min) = match info {
        0..=23 => return Ok((major, info as u64)),
        INFO_U8 => (read_be(reader, field, 1)?, INFO_U8 as u64),
        INFO_U16 => (read_be(reader, field, 2)?, u8::MAX as u64 + 1),
        INFO_U32 => (read_be(reader, field, 4)?, u16::MAX as u64 + 1),
        INFO_U64 => (read_be(reader, field, 8)?, u32::MAX as u64 + 1),
        INFO_INDEFINITE => {
            return Err(Error::InvalidHeader {
                field,
                reason: "indefinite length not allowed here".to_string(),
            })
        }
        _ => {
            return Err(Error::InvalidHeader {
                field,
                reason: format!("reserved additional info {}", info),
            })
        }
    };

    if len < min {
        return Err(Error::InvalidHeader {
            field,
            reason: format!("length {} is not minimally encoded", len),
        });
    }

    Ok((major, len))
}

fn read_be<R: Read + ?Sized>(reader: &mut R, field: Field, width: usize) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader
        .read_exact(&mut buf[8 - width..])
        .map_err(Error::io(field))?;
    Ok(u64::from_be_bytes(buf))
}

/// Read a length-prefixed byte string of at most `max` bytes
///
/// The length is checked before anything is allocated, and the payload is
/// read incrementally so a truncated stream never forces a buffer of the
/// declared size.
pub fn read_byte_string<R: Read + ?Sized>(reader: &mut R, field: Field, max: u64) -> Result<Vec<u8>> {
    let (major, len) = read_header(reader, field)?;

    if major != MajorType::ByteString as u8 {
        return Err(Error::InvalidHeader {
            field,
            reason: format!("expected byte string (major type 2), got major type {}", major),
        });
    }

    if len > max {
        return Err(Error::FieldTooLarge { field, len, max });
    }

    let mut buf = Vec::new();
    let read = Read::take(&mut *reader, len)
        .read_to_end(&mut buf)
        .map_err(Error::io(field))?;

    if (read as u64) < len {
        return Err(Error::Io {
            field,
            source: io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, got {}", len, read),
            ),
        });
    }

    Ok(buf)
}
