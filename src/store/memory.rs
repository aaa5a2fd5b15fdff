//! In-memory store
//!
//! BTreeMap-based store with RwLock for concurrency.
//!
//! Cloning a `MemoryStore` yields another handle to the same data, which is
//! how batches and cursors reach the map after the call that created them.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{Error, Result};

use super::{Batch, Batching, Entry, Key, Query, QueryResults, Store};

/// State shared by the store and every batch/cursor created from it
#[derive(Debug, Default)]
struct Shared {
    data: RwLock<BTreeMap<Key, Bytes>>,
    /// Approximate size in bytes (keys + values)
    size: AtomicUsize,
    closed: AtomicBool,
    /// Cursors opened by `query` and not yet closed
    open_cursors: AtomicUsize,
}

impl Shared {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Insert under an already held write lock, keeping `size` current
    fn insert(&self, data: &mut BTreeMap<Key, Bytes>, key: Key, value: Bytes) {
        let added = key.len() + value.len();
        if let Some(old) = data.insert(key.clone(), value) {
            self.size.fetch_sub(key.len() + old.len(), Ordering::Relaxed);
        }
        self.size.fetch_add(added, Ordering::Relaxed);
    }

    fn remove(&self, data: &mut BTreeMap<Key, Bytes>, key: &Key) {
        if let Some(old) = data.remove(key.as_bytes()) {
            self.size.fetch_sub(key.len() + old.len(), Ordering::Relaxed);
        }
    }
}

/// Ordered in-memory key-value store
///
/// ## Concurrency:
/// - `data`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - Batches apply all their operations under one write lock acquisition
/// - Cursors take the read lock per step, so they observe writes made while
///   they are open
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Approximate size in bytes of all keys and values
    pub fn size(&self) -> usize {
        self.shared.size.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> usize {
        self.shared.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.data.read().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Number of query cursors that have not been closed yet
    pub fn open_cursors(&self) -> usize {
        self.shared.open_cursors.load(Ordering::SeqCst)
    }
}

impl Store for MemoryStore {
    type Results = MemoryResults;

    fn get(&self, key: &Key) -> Result<Option<Bytes>> {
        self.shared.check_open()?;
        Ok(self.shared.data.read().get(key.as_bytes()).cloned())
    }

    fn has(&self, key: &Key) -> Result<bool> {
        self.shared.check_open()?;
        Ok(self.shared.data.read().contains_key(key.as_bytes()))
    }

    fn get_size(&self, key: &Key) -> Result<Option<usize>> {
        self.shared.check_open()?;
        Ok(self.shared.data.read().get(key.as_bytes()).map(Bytes::len))
    }

    fn query(&self, query: Query) -> Result<MemoryResults> {
        self.shared.check_open()?;
        self.shared.open_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryResults {
            shared: Some(Arc::clone(&self.shared)),
            query,
            last: None,
            skipped: 0,
            returned: 0,
        })
    }

    fn put(&self, key: Key, value: Bytes) -> Result<()> {
        self.shared.check_open()?;
        let mut data = self.shared.data.write();
        self.shared.insert(&mut data, key, value);
        Ok(())
    }

    fn delete(&self, key: &Key) -> Result<()> {
        self.shared.check_open()?;
        let mut data = self.shared.data.write();
        self.shared.remove(&mut data, key);
        Ok(())
    }

    fn sync(&self, _prefix: &Key) -> Result<()> {
        // Nothing to persist
        self.shared.check_open()
    }

    fn close(&self) -> Result<()> {
        self.shared.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl Batching for MemoryStore {
    type Batch = MemoryBatch;

    fn batch(&self) -> Result<MemoryBatch> {
        self.shared.check_open()?;
        Ok(MemoryBatch {
            shared: Arc::clone(&self.shared),
            ops: Vec::new(),
        })
    }
}

// =============================================================================
// Batch
// =============================================================================

#[derive(Debug)]
enum BatchOp {
    Put(Key, Bytes),
    Delete(Key),
}

/// Pending writes and deletes for a [`MemoryStore`]
///
/// Nothing is visible until `commit`, which applies every operation in
/// order under a single write lock.
#[derive(Debug)]
pub struct MemoryBatch {
    shared: Arc<Shared>,
    ops: Vec<BatchOp>,
}

impl MemoryBatch {
    /// Number of pending operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Batch for MemoryBatch {
    fn put(&mut self, key: Key, value: Bytes) -> Result<()> {
        self.ops.push(BatchOp::Put(key, value));
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.ops.push(BatchOp::Delete(key.clone()));
        Ok(())
    }

    fn commit(self) -> Result<()> {
        self.shared.check_open()?;
        let mut data = self.shared.data.write();
        for op in self.ops {
            match op {
                BatchOp::Put(key, value) => self.shared.insert(&mut data, key, value),
                BatchOp::Delete(key) => self.shared.remove(&mut data, &key),
            }
        }
        Ok(())
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Lazy cursor over a [`MemoryStore`] in key order
///
/// Each step looks up the first key after the previous one, so the cursor
/// holds no lock between calls and sees concurrent writes to keys it has
/// not reached yet.
#[derive(Debug)]
pub struct MemoryResults {
    /// `None` once closed
    shared: Option<Arc<Shared>>,
    query: Query,
    /// Last key visited (returned or skipped)
    last: Option<Key>,
    skipped: usize,
    returned: usize,
}

impl MemoryResults {
    /// First entry strictly after the cursor position
    fn advance(shared: &Shared, query: &Query, last: Option<&Key>) -> Option<(Key, Bytes)> {
        let lower = match (last, &query.prefix) {
            (Some(key), _) => Bound::Excluded(key.as_bytes()),
            (None, Some(prefix)) => Bound::Included(prefix.as_bytes()),
            (None, None) => Bound::Unbounded,
        };

        let data = shared.data.read();
        data.range::<[u8], _>((lower, Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()))
    }
}

impl Iterator for MemoryResults {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let shared = self.shared.as_ref()?;

        if let Some(limit) = self.query.limit {
            if self.returned >= limit {
                return None;
            }
        }

        loop {
            if let Err(e) = shared.check_open() {
                return Some(Err(e));
            }

            let (key, value) = Self::advance(shared, &self.query, self.last.as_ref())?;

            // Keys are ordered, so the first miss ends the prefix range
            if !self.query.matches(&key) {
                return None;
            }

            self.last = Some(key.clone());

            if self.skipped < self.query.offset {
                self.skipped += 1;
                continue;
            }

            self.returned += 1;
            let value = if self.query.keys_only {
                Bytes::new()
            } else {
                value
            };
            return Some(Ok(Entry { key, value }));
        }
    }
}

impl QueryResults for MemoryResults {
    fn close(&mut self) -> Result<()> {
        if let Some(shared) = self.shared.take() {
            shared.open_cursors.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
