//! Shared test helpers

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use bytes::Bytes;
use crossbeam::channel::{Receiver, Sender};

use kvsnap::store::{
    Batching, Entry, Key, MemoryBatch, MemoryResults, MemoryStore, Query, QueryResults, Store,
};
use kvsnap::{Cancellation, Config, Error, Result};

/// Install a fmt subscriber once; honours RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Encode `entries` into an in-memory envelope
pub fn encode(entries: &[Entry]) -> Vec<u8> {
    let mut out = Vec::new();
    kvsnap::write_backup(
        &mut out,
        entries.iter().cloned().map(Ok),
        &Config::default(),
        &Cancellation::new(),
    )
    .unwrap();
    out
}

/// Decode an envelope, collecting every entry the callback saw
pub fn decode(bytes: &[u8]) -> Result<Vec<Entry>> {
    let mut seen = Vec::new();
    kvsnap::read_backup(bytes, &Config::default(), |key, value| {
        seen.push(Entry { key, value });
        Ok(())
    })?;
    Ok(seen)
}

pub fn populated_store(count: usize) -> MemoryStore {
    let store = MemoryStore::new();
    for i in 0..count {
        store
            .put(
                Key::from(format!("/key/{:05}", i)),
                Bytes::from(format!("value-{}", i)),
            )
            .unwrap();
    }
    store
}

// =============================================================================
// Writers
// =============================================================================

/// Accepts `limit` bytes, then fails every write
pub struct FailingWriter {
    pub written: Vec<u8>,
    limit: usize,
}

impl FailingWriter {
    pub fn new(limit: usize) -> Self {
        Self {
            written: Vec::new(),
            limit,
        }
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.limit - self.written.len();
        if room == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        let n = room.min(buf.len());
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Blocks on its first write until released
///
/// Sends on `started` once the first byte arrives (the backup then holds
/// the exclusive guard), waits for a message on `release`, and records in
/// `flushed` when the final flush happens.
pub struct GatedWriter {
    pub buf: Vec<u8>,
    started: Option<Sender<()>>,
    release: Receiver<()>,
    flushed: Arc<AtomicBool>,
}

impl GatedWriter {
    pub fn new(started: Sender<()>, release: Receiver<()>, flushed: Arc<AtomicBool>) -> Self {
        Self {
            buf: Vec::new(),
            started: Some(started),
            release,
            flushed,
        }
    }
}

impl Write for GatedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(started) = self.started.take() {
            started.send(()).unwrap();
            self.release.recv().unwrap();
        }
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Faulty Store
// =============================================================================

/// MemoryStore whose cursors fail after yielding `fail_after` entries
#[derive(Clone)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    fail_after: usize,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore, fail_after: usize) -> Self {
        Self { inner, fail_after }
    }
}

pub struct FaultyResults {
    inner: MemoryResults,
    remaining: usize,
}

impl Iterator for FaultyResults {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return Some(Err(Error::Storage("cursor broke".to_string())));
        }
        self.remaining -= 1;
        self.inner.next()
    }
}

impl QueryResults for FaultyResults {
    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

impl Store for FaultyStore {
    type Results = FaultyResults;

    fn get(&self, key: &Key) -> Result<Option<Bytes>> {
        self.inner.get(key)
    }

    fn has(&self, key: &Key) -> Result<bool> {
        self.inner.has(key)
    }

    fn get_size(&self, key: &Key) -> Result<Option<usize>> {
        self.inner.get_size(key)
    }

    fn query(&self, query: Query) -> Result<FaultyResults> {
        Ok(FaultyResults {
            inner: self.inner.query(query)?,
            remaining: self.fail_after,
        })
    }

    fn put(&self, key: Key, value: Bytes) -> Result<()> {
        self.inner.put(key, value)
    }

    fn delete(&self, key: &Key) -> Result<()> {
        self.inner.delete(key)
    }

    fn sync(&self, prefix: &Key) -> Result<()> {
        self.inner.sync(prefix)
    }

    fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

impl Batching for FaultyStore {
    type Batch = MemoryBatch;

    fn batch(&self) -> Result<MemoryBatch> {
        self.inner.batch()
    }
}

// =============================================================================
// Rendezvous Store
// =============================================================================

/// MemoryStore whose `put` waits until `parties` puts are inside it at once
///
/// Only completes when that many writers hold their locks concurrently.
pub struct RendezvousStore {
    pub inner: MemoryStore,
    barrier: Arc<Barrier>,
}

impl RendezvousStore {
    pub fn new(inner: MemoryStore, parties: usize) -> Self {
        Self {
            inner,
            barrier: Arc::new(Barrier::new(parties)),
        }
    }
}

impl Store for RendezvousStore {
    type Results = MemoryResults;

    fn get(&self, key: &Key) -> Result<Option<Bytes>> {
        self.inner.get(key)
    }

    fn has(&self, key: &Key) -> Result<bool> {
        self.inner.has(key)
    }

    fn get_size(&self, key: &Key) -> Result<Option<usize>> {
        self.inner.get_size(key)
    }

    fn query(&self, query: Query) -> Result<MemoryResults> {
        self.inner.query(query)
    }

    fn put(&self, key: Key, value: Bytes) -> Result<()> {
        self.barrier.wait();
        self.inner.put(key, value)
    }

    fn delete(&self, key: &Key) -> Result<()> {
        self.inner.delete(key)
    }

    fn sync(&self, prefix: &Key) -> Result<()> {
        self.inner.sync(prefix)
    }

    fn close(&self) -> Result<()> {
        self.inner.close()
    }
}
