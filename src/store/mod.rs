//! Store Module
//!
//! The capability surface kvsnap consumes from a key-value store, plus an
//! in-memory implementation of it.
//!
//! ## Responsibilities
//! - Point reads: get / has / get_size
//! - Full or filtered scans through a closeable, lazy cursor
//! - Mutations: put / delete / sync / close
//! - Batches of pending mutations applied on commit
//!
//! The store owns its own durability and ordering; backup only relies on a
//! full scan yielding every live entry exactly once.

mod memory;

use std::borrow::Borrow;
use std::fmt;

use bytes::Bytes;

use crate::error::Result;

pub use memory::{MemoryBatch, MemoryResults, MemoryStore};

// =============================================================================
// Data Types
// =============================================================================

/// Opaque lookup key
///
/// Usually a path-like string such as `/blocks/abc`, but any byte sequence
/// is valid; nothing in kvsnap interprets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Bytes);

impl Key {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if this key starts with the bytes of `prefix`
    pub fn has_prefix(&self, prefix: &Key) -> bool {
        self.0.starts_with(prefix.as_bytes())
    }

    /// Path-style child key: `/a` + `b` → `/a/b`
    pub fn child(&self, name: &str) -> Key {
        let mut buf = Vec::with_capacity(self.len() + 1 + name.len());
        buf.extend_from_slice(&self.0);
        if !self.0.ends_with(b"/") {
            buf.push(b'/');
        }
        buf.extend_from_slice(name.as_bytes());
        Key(Bytes::from(buf))
    }
}

impl Borrow<[u8]> for Key {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(Bytes::from(s))
    }
}

impl From<&[u8]> for Key {
    fn from(b: &[u8]) -> Self {
        Key(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for Key {
    fn from(b: Vec<u8>) -> Self {
        Key(Bytes::from(b))
    }
}

impl From<Bytes> for Key {
    fn from(b: Bytes) -> Self {
        Key(b)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// One key-value pair produced by a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: Bytes,
}

impl Entry {
    pub fn new(key: impl Into<Key>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Scan parameters
///
/// The default query is the unfiltered full scan that backup relies on.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Only return keys starting with this prefix
    pub prefix: Option<Key>,
    /// Skip this many matching entries
    pub offset: usize,
    /// Stop after this many entries
    pub limit: Option<usize>,
    /// Return empty values
    pub keys_only: bool,
}

impl Query {
    /// Every entry in the store
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<Key>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    /// Whether `key` passes the prefix filter
    pub fn matches(&self, key: &Key) -> bool {
        self.prefix.as_ref().map_or(true, |p| key.has_prefix(p))
    }
}

// =============================================================================
// Store Traits
// =============================================================================

/// A lazy, closeable cursor over query results
///
/// Implementations must release their resources in `close`, which may be
/// called more than once. Use [`ScopedResults`] to guarantee it runs.
pub trait QueryResults: Iterator<Item = Result<Entry>> + Send {
    fn close(&mut self) -> Result<()>;
}

/// The key-value store surface consumed by kvsnap
pub trait Store: Send + Sync {
    type Results: QueryResults;

    /// Value for `key`, or `None` if absent
    fn get(&self, key: &Key) -> Result<Option<Bytes>>;

    fn has(&self, key: &Key) -> Result<bool>;

    /// Size in bytes of the value for `key`, or `None` if absent
    fn get_size(&self, key: &Key) -> Result<Option<usize>>;

    fn query(&self, query: Query) -> Result<Self::Results>;

    fn put(&self, key: Key, value: Bytes) -> Result<()>;

    fn delete(&self, key: &Key) -> Result<()>;

    /// Make writes under `prefix` durable
    fn sync(&self, prefix: &Key) -> Result<()>;

    fn close(&self) -> Result<()>;
}

/// Pending mutations applied together on commit
pub trait Batch: Send {
    fn put(&mut self, key: Key, value: Bytes) -> Result<()>;

    fn delete(&mut self, key: &Key) -> Result<()>;

    fn commit(self) -> Result<()>;
}

/// A store that can group mutations into batches
pub trait Batching: Store {
    type Batch: Batch;

    fn batch(&self) -> Result<Self::Batch>;
}

// =============================================================================
// Scoped Cursor
// =============================================================================

/// Closes the wrapped cursor when dropped
///
/// Call [`ScopedResults::close`] on the success path to observe the close
/// result; on every other path (error, cancellation, panic) the cursor is
/// closed on drop and a failure is logged.
pub struct ScopedResults<R: QueryResults> {
    results: R,
    closed: bool,
}

impl<R: QueryResults> ScopedResults<R> {
    pub fn new(results: R) -> Self {
        Self {
            results,
            closed: false,
        }
    }

    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.results.close()
    }
}

impl<R: QueryResults> Iterator for ScopedResults<R> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.results.next()
    }
}

impl<R: QueryResults> Drop for ScopedResults<R> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.results.close() {
            tracing::error!("query close error: {}", e);
        }
    }
}
