//! # kvsnap
//!
//! Consistent full backups of an ordered key-value store, with:
//! - A streaming, self-describing binary envelope
//! - SHA-256 checksum over the entry stream, verified on restore
//! - Exclusive/shared locking so a backup never interleaves with writes
//! - Reads that keep running while a backup is in progress
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Callers                               │
//! │          (reads, writes, batches, backup requests)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   BackupStore (proxy)                        │
//! │   reads: pass-through │ writes: shared │ backup: exclusive   │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │ ConsistencyGuard│                │      Codec      │
//!   │    (RwLock)     │                │ (SHA-256 tee)   │
//!   └─────────────────┘                └────────┬────────┘
//!                                               │
//!                                               ▼
//!                                      ┌─────────────────┐
//!                                      │  Store (child)  │
//!                                      │  query / put …  │
//!                                      └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use kvsnap::store::{Key, MemoryStore, Store};
//! use kvsnap::{proxy, BackupStore, Config};
//!
//! let store = BackupStore::new(MemoryStore::new());
//! store.put(Key::from("/a"), "b".into()).unwrap();
//!
//! let mut envelope = Vec::new();
//! store.backup(&mut envelope).unwrap();
//!
//! let restored = MemoryStore::new();
//! proxy::restore_into(&restored, envelope.as_slice(), &Config::default()).unwrap();
//! assert_eq!(restored.get(&Key::from("/a")).unwrap().as_deref(), Some(&b"b"[..]));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod cancel;

pub mod codec;
pub mod guard;
pub mod store;
pub mod proxy;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use cancel::Cancellation;
pub use codec::{read_backup, verify_backup, write_backup, BackupSummary, RestoreSummary};
pub use config::Config;
pub use error::{Error, Result};
pub use proxy::{restore_into, BackupStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvsnap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
