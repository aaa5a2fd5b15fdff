//! Hashing adapters
//!
//! Fan a byte stream out to a SHA-256 accumulator alongside the real sink or
//! source, so the digest always sees exactly the bytes that went through.

use std::io::{self, Read, Write};

use sha2::{Digest, Sha256};

use super::CHECKSUM_SIZE;

/// Writer that feeds every byte written to the sink into a SHA-256 digest
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    /// Bytes accepted by the sink so far
    bytes: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    /// Number of bytes written through this adapter
    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Finalize the digest and hand back the sink
    pub fn finish(self) -> (W, [u8; CHECKSUM_SIZE]) {
        (self.inner, self.hasher.finalize().into())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        // Only hash what the sink actually took; write_all retries the rest.
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reader that tees every byte read from the source into a SHA-256 digest
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    bytes: u64,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    /// Number of bytes read through this adapter
    pub fn bytes_read(&self) -> u64 {
        self.bytes
    }

    /// Finalize the digest and hand back the source
    pub fn finish(self) -> (R, [u8; CHECKSUM_SIZE]) {
        (self.inner, self.hasher.finalize().into())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }
}
