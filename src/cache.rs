//! Shared, bounded, content-addressed cache with LRU eviction.
//!
//! Keyed by the literal request URI. A single [`tokio::sync::Mutex`] guards
//! the whole map; callers must never hold it across a blocking or
//! await-suspending I/O call (lookups copy the value out before the caller
//! writes it to a socket).

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

/// Bound on any single line of text and on the rewritten outbound request.
pub const MAXLINE: usize = 1024;
/// Largest reply the cache will store.
pub const MAX_OBJECT_SIZE: usize = 100 * 1024;
/// The cache's total byte budget.
pub const MAX_CACHE_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    length: usize,
    stamp: u64,
}

/// Outcome of an [`Cache::insert`] call, distinguished for testability
/// (spec invariants around duplicate keys and oversize rejection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// A fresh entry was stored, possibly after evicting LRU victims.
    Inserted,
    /// An entry for this key already existed; the existing entry and its
    /// LRU stamp are left untouched.
    Duplicate,
    /// `length` exceeded `MAX_OBJECT_SIZE`; nothing was stored.
    TooLarge,
}

struct Inner {
    entries: HashMap<String, Entry>,
    total_bytes: usize,
    counter: u64,
}

impl Inner {
    fn next_stamp(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    fn evict_one(&mut self) -> bool {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.stamp)
            .map(|(k, _)| k.clone());

        match victim {
            Some(key) => {
                if let Some(entry) = self.entries.remove(&key) {
                    self.total_bytes -= entry.length;
                }
                true
            }
            None => false,
        }
    }
}

/// A bounded, thread-safe LRU cache of HTTP responses keyed by request URI.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Mutex<Inner>>,
}

impl Cache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                total_bytes: 0,
                counter: 0,
            })),
        }
    }

    /// Looks up `key`. On hit, bumps the entry's LRU stamp above every other
    /// currently cached stamp and returns a cheap clone of the stored bytes.
    /// A miss has no side effects.
    pub async fn lookup(&self, key: &str) -> Option<Bytes> {
        let mut inner = self.inner.lock().await;
        let stamp = if inner.entries.contains_key(key) {
            Some(inner.next_stamp())
        } else {
            None
        };
        let stamp = stamp?;
        let entry = inner.entries.get_mut(key)?;
        entry.stamp = stamp;
        Some(entry.value.clone())
    }

    /// Inserts `value` (of length `length`) under `key`.
    ///
    /// If `key` already has an entry, this is a no-op (the existing entry
    /// keeps its value and its stamp). Otherwise, LRU victims are evicted
    /// until there is room, then the new entry is added with a fresh stamp.
    pub async fn insert(&self, key: String, value: Bytes, length: usize) -> Insert {
        if length > MAX_OBJECT_SIZE {
            return Insert::TooLarge;
        }

        let mut inner = self.inner.lock().await;
        if inner.entries.contains_key(&key) {
            return Insert::Duplicate;
        }

        while inner.total_bytes + length > MAX_CACHE_SIZE {
            if !inner.evict_one() {
                break;
            }
        }

        let stamp = inner.next_stamp();
        inner.entries.insert(
            key,
            Entry {
                value,
                length,
                stamp,
            },
        );
        inner.total_bytes += length;
        Insert::Inserted
    }

    pub async fn total_bytes(&self) -> usize {
        self.inner.lock().await.total_bytes
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
