//! Store Proxy
//!
//! Wraps a store so it can be backed up consistently while in use.
//!
//! ## Responsibilities
//! - Pass reads and queries straight through (no locking)
//! - Route every mutation through the consistency guard in shared mode
//! - Run backups under the guard in exclusive mode
//!
//! `BackupStore<S>` implements [`Store`] and [`Batching`] itself, so it can
//! be dropped in wherever the wrapped store was used.

use std::io::{Read, Write};
use std::sync::Arc;

use bytes::Bytes;

use crate::cancel::Cancellation;
use crate::codec::{self, BackupSummary, RestoreSummary};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::guard::ConsistencyGuard;
use crate::store::{Batch, Batching, Key, Query, ScopedResults, Store};

/// A store decorated with consistent full backups
///
/// ## Concurrency Model
///
/// - **Backup**: exclusive guard for the whole scan-and-encode window
/// - **Mutations** (put/delete/sync/close/batch commit): shared guard per call
/// - **Reads** (get/has/get_size/query): no guard; they keep running during
///   a backup
pub struct BackupStore<S> {
    /// The wrapped store
    child: S,

    /// Shared with every batch handed out, so commits see the same lock
    guard: Arc<ConsistencyGuard>,

    config: Config,
}

impl<S: Store> BackupStore<S> {
    /// Wrap `child` with the default configuration
    pub fn new(child: S) -> Self {
        Self::with_config(child, Config::default())
    }

    pub fn with_config(child: S, config: Config) -> Self {
        Self {
            child,
            guard: Arc::new(ConsistencyGuard::new()),
            config,
        }
    }

    /// Write a full dump of the store to `out`
    ///
    /// Waits for in-flight mutations to finish, then blocks all mutations
    /// until the last byte has been written. Reads are not blocked.
    pub fn backup<W: Write>(&self, out: W) -> Result<BackupSummary> {
        self.backup_with_cancel(out, &Cancellation::new())
    }

    /// Like [`backup`](Self::backup), stopping early once `cancel` is set
    pub fn backup_with_cancel<W: Write>(
        &self,
        out: W,
        cancel: &Cancellation,
    ) -> Result<BackupSummary> {
        let _exclusive = self.guard.exclusive();

        tracing::info!("Starting datastore backup");

        let results = self
            .child
            .query(Query::all())
            .map_err(|e| Error::store("query", e))?;
        let mut results = ScopedResults::new(results);

        let summary = codec::write_backup(out, &mut results, &self.config, cancel)?;

        if let Err(e) = results.close() {
            tracing::error!("query close error: {}", e);
        }

        tracing::info!(
            entries = summary.entries,
            bytes = summary.bytes_written,
            checksum = %hex::encode(summary.checksum),
            "Datastore backup done"
        );

        Ok(summary)
    }

    /// True while a backup holds the exclusive guard
    pub fn is_backup_in_progress(&self) -> bool {
        self.guard.is_backup_in_progress()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The wrapped store
    ///
    /// Writes made through this reference bypass the guard.
    pub fn inner(&self) -> &S {
        &self.child
    }

    pub fn into_inner(self) -> S {
        self.child
    }
}

impl<S: Store> Store for BackupStore<S> {
    type Results = S::Results;

    fn get(&self, key: &Key) -> Result<Option<Bytes>> {
        self.child.get(key)
    }

    fn has(&self, key: &Key) -> Result<bool> {
        self.child.has(key)
    }

    fn get_size(&self, key: &Key) -> Result<Option<usize>> {
        self.child.get_size(key)
    }

    fn query(&self, query: Query) -> Result<Self::Results> {
        self.child.query(query)
    }

    fn put(&self, key: Key, value: Bytes) -> Result<()> {
        let _shared = self.guard.shared();
        self.child.put(key, value)
    }

    fn delete(&self, key: &Key) -> Result<()> {
        let _shared = self.guard.shared();
        self.child.delete(key)
    }

    fn sync(&self, prefix: &Key) -> Result<()> {
        let _shared = self.guard.shared();
        self.child.sync(prefix)
    }

    fn close(&self) -> Result<()> {
        let _shared = self.guard.shared();
        self.child.close()
    }
}

impl<S: Batching> Batching for BackupStore<S> {
    type Batch = GuardedBatch<S::Batch>;

    fn batch(&self) -> Result<Self::Batch> {
        Ok(GuardedBatch {
            batch: self.child.batch()?,
            guard: Arc::clone(&self.guard),
        })
    }
}

/// Batch whose commit waits out any running backup
///
/// Accumulating operations takes no lock; only `commit` takes the shared
/// guard, so a batch lands entirely before or entirely after a backup.
pub struct GuardedBatch<B> {
    batch: B,
    guard: Arc<ConsistencyGuard>,
}

impl<B: Batch> Batch for GuardedBatch<B> {
    fn put(&mut self, key: Key, value: Bytes) -> Result<()> {
        self.batch.put(key, value)
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.batch.delete(key)
    }

    fn commit(self) -> Result<()> {
        let GuardedBatch { batch, guard } = self;
        let _shared = guard.shared();
        batch.commit()
    }
}

// =============================================================================
// Restore Helpers
// =============================================================================

/// Restore an envelope into `store`
///
/// Decoded entries are collected in a single batch that is committed only
/// after the checksum has verified, so a damaged backup leaves the store
/// untouched. Keys already in the store and absent from the backup are
/// kept.
pub fn restore_into<S, R>(store: &S, reader: R, config: &Config) -> Result<RestoreSummary>
where
    S: Batching,
    R: Read,
{
    let mut batch = store.batch()?;

    let summary = codec::read_backup(reader, config, |key, value| batch.put(key, value))?;

    batch.commit()?;

    tracing::info!(entries = summary.entries, "Restore committed");

    Ok(summary)
}
