//! Consistency Guard
//!
//! Coordinates a single in-flight backup against concurrent mutations.
//!
//! ## Lock Modes
//! - **Exclusive**: held by backup from query open until the last byte is
//!   written. No mutation and no other backup can run meanwhile.
//! - **Shared**: held by each mutation (put, delete, sync, close, batch
//!   commit) for the duration of that one call. Shared holders never block
//!   each other.
//! - Reads and queries take no lock at all.
//!
//! `parking_lot::RwLock` is task-fair: once a backup is waiting for the
//! exclusive lock, new shared acquirers queue behind it instead of starving
//! it.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Held by a backup for its whole scan-and-encode window
pub type ExclusiveGuard<'a> = RwLockWriteGuard<'a, ()>;

/// Held by a mutation for the duration of one call
pub type SharedGuard<'a> = RwLockReadGuard<'a, ()>;

/// Exclusive/shared lock guarding "a backup is in progress"
#[derive(Debug, Default)]
pub struct ConsistencyGuard {
    lock: RwLock<()>,
}

impl ConsistencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until no mutation is running, then exclude all of them
    pub fn exclusive(&self) -> ExclusiveGuard<'_> {
        self.lock.write()
    }

    /// Block while a backup is running (or waiting to run)
    pub fn shared(&self) -> SharedGuard<'_> {
        self.lock.read()
    }

    pub fn is_backup_in_progress(&self) -> bool {
        self.lock.is_locked_exclusive()
    }
}
