//! MemoryStore Tests
//!
//! Tests verify:
//! - Basic CRUD operations
//! - Size tracking
//! - Query filters and lazy cursors
//! - Batch semantics
//! - Close behaviour

use bytes::Bytes;

use kvsnap::store::{Batch, Batching, Entry, Key, MemoryStore, Query, QueryResults, Store};
use kvsnap::Error;

fn collect(store: &MemoryStore, query: Query) -> Vec<Entry> {
    let mut results = store.query(query).unwrap();
    let entries = results.by_ref().map(|r| r.unwrap()).collect();
    results.close().unwrap();
    entries
}

fn keys(entries: &[Entry]) -> Vec<String> {
    entries.iter().map(|e| e.key.to_string()).collect()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_store_is_empty() {
    let store = MemoryStore::new();
    assert_eq!(store.entry_count(), 0);
    assert_eq!(store.size(), 0);
    assert!(store.is_empty());
}

#[test]
fn test_put_get_has_size() {
    let store = MemoryStore::new();
    let key = Key::from("/key1");

    store.put(key.clone(), Bytes::from("value1")).unwrap();

    assert_eq!(store.get(&key).unwrap(), Some(Bytes::from("value1")));
    assert!(store.has(&key).unwrap());
    assert_eq!(store.get_size(&key).unwrap(), Some(6));

    let missing = Key::from("/missing");
    assert_eq!(store.get(&missing).unwrap(), None);
    assert!(!store.has(&missing).unwrap());
    assert_eq!(store.get_size(&missing).unwrap(), None);
}

#[test]
fn test_overwrite_and_delete_track_size() {
    let store = MemoryStore::new();
    let key = Key::from("abc");

    store.put(key.clone(), Bytes::from("12345")).unwrap();
    assert_eq!(store.size(), 8);

    store.put(key.clone(), Bytes::from("1")).unwrap();
    assert_eq!(store.size(), 4);
    assert_eq!(store.entry_count(), 1);

    store.delete(&key).unwrap();
    assert_eq!(store.size(), 0);
    assert!(store.is_empty());

    // Deleting a missing key is not an error
    store.delete(&key).unwrap();
}

#[test]
fn test_clones_share_data() {
    let store = MemoryStore::new();
    let other = store.clone();

    store.put(Key::from("k"), Bytes::from("v")).unwrap();
    assert_eq!(other.get(&Key::from("k")).unwrap(), Some(Bytes::from("v")));
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_query_all_in_key_order() {
    let store = MemoryStore::new();
    for k in ["/c", "/a", "/b"] {
        store.put(Key::from(k), Bytes::from(k)).unwrap();
    }

    let entries = collect(&store, Query::all());
    assert_eq!(keys(&entries), vec!["/a", "/b", "/c"]);
    assert_eq!(entries[0].value, Bytes::from("/a"));
}

#[test]
fn test_query_prefix_offset_limit_keys_only() {
    let store = MemoryStore::new();
    for k in ["/a/1", "/a/2", "/a/3", "/a/4", "/b/1", "/"] {
        store.put(Key::from(k), Bytes::from("v")).unwrap();
    }

    let entries = collect(&store, Query::with_prefix("/a/"));
    assert_eq!(keys(&entries), vec!["/a/1", "/a/2", "/a/3", "/a/4"]);

    let entries = collect(&store, Query::with_prefix("/a/").offset(1).limit(2));
    assert_eq!(keys(&entries), vec!["/a/2", "/a/3"]);

    let entries = collect(&store, Query::with_prefix("/b").keys_only());
    assert_eq!(keys(&entries), vec!["/b/1"]);
    assert!(entries[0].value.is_empty());
}

#[test]
fn test_cursor_is_lazy() {
    let store = MemoryStore::new();
    store.put(Key::from("a"), Bytes::from("1")).unwrap();
    store.put(Key::from("c"), Bytes::from("3")).unwrap();

    let mut results = store.query(Query::all()).unwrap();
    assert_eq!(results.next().unwrap().unwrap().key, Key::from("a"));

    // Written after the cursor opened but ahead of its position
    store.put(Key::from("b"), Bytes::from("2")).unwrap();

    let rest: Vec<Key> = results.by_ref().map(|r| r.unwrap().key).collect();
    assert_eq!(rest, vec![Key::from("b"), Key::from("c")]);
    results.close().unwrap();
}

#[test]
fn test_cursor_accounting() {
    let store = MemoryStore::new();
    store.put(Key::from("a"), Bytes::from("1")).unwrap();

    let mut first = store.query(Query::all()).unwrap();
    let mut second = store.query(Query::all()).unwrap();
    assert_eq!(store.open_cursors(), 2);

    first.close().unwrap();
    // Closing twice is harmless
    first.close().unwrap();
    assert_eq!(store.open_cursors(), 1);
    assert!(first.next().is_none());

    second.close().unwrap();
    assert_eq!(store.open_cursors(), 0);
}

// =============================================================================
// Batch Tests
// =============================================================================

#[test]
fn test_batch_invisible_until_commit() {
    let store = MemoryStore::new();
    store.put(Key::from("gone"), Bytes::from("x")).unwrap();

    let mut batch = store.batch().unwrap();
    batch.put(Key::from("new"), Bytes::from("y")).unwrap();
    batch.delete(&Key::from("gone")).unwrap();
    assert_eq!(batch.len(), 2);

    assert!(!store.has(&Key::from("new")).unwrap());
    assert!(store.has(&Key::from("gone")).unwrap());

    batch.commit().unwrap();

    assert!(store.has(&Key::from("new")).unwrap());
    assert!(!store.has(&Key::from("gone")).unwrap());
}

#[test]
fn test_batch_applies_in_order() {
    let store = MemoryStore::new();
    let key = Key::from("k");

    let mut batch = store.batch().unwrap();
    batch.put(key.clone(), Bytes::from("1")).unwrap();
    batch.delete(&key).unwrap();
    batch.put(key.clone(), Bytes::from("2")).unwrap();
    batch.commit().unwrap();

    assert_eq!(store.get(&key).unwrap(), Some(Bytes::from("2")));
}

#[test]
fn test_dropped_batch_does_nothing() {
    let store = MemoryStore::new();
    {
        let mut batch = store.batch().unwrap();
        batch.put(Key::from("k"), Bytes::from("v")).unwrap();
    }
    assert!(store.is_empty());
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_operations_fail_after_close() {
    let store = MemoryStore::new();
    let key = Key::from("k");
    store.put(key.clone(), Bytes::from("v")).unwrap();

    let mut batch = store.batch().unwrap();
    batch.put(Key::from("late"), Bytes::from("v")).unwrap();

    store.close().unwrap();
    assert!(store.is_closed());
    // Close is idempotent
    store.close().unwrap();

    assert!(matches!(store.get(&key), Err(Error::Closed)));
    assert!(matches!(store.put(key.clone(), Bytes::new()), Err(Error::Closed)));
    assert!(matches!(store.sync(&Key::default()), Err(Error::Closed)));
    assert!(matches!(store.query(Query::all()), Err(Error::Closed)));
    assert!(matches!(batch.commit(), Err(Error::Closed)));
}

#[test]
fn test_key_helpers() {
    let root = Key::from("/blocks");
    let child = root.child("abc");
    assert_eq!(child, Key::from("/blocks/abc"));
    assert!(child.has_prefix(&root));
    assert_eq!(Key::from("/").child("x"), Key::from("/x"));

    let binary = Key::from(vec![0xffu8, 0x00]);
    assert_eq!(binary.len(), 2);
    assert_eq!(binary.to_string(), "\u{fffd}\u{0}");
}
