//! A mutex-guarded map with atomic read-modify-write operations.

use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::{Mutex, MutexGuard};

/// A thread-safe map supporting atomic read-modify-write and compound
/// check-then-act operations.
///
/// The whole table sits behind one async mutex, so any operation excludes
/// every other one, and [`lock`](SharedMap::lock) can hold that exclusion
/// across an entire compound sequence (including awaits, such as invoking an
/// async factory while deciding whether to insert). Iteration order is
/// unspecified; callers must not depend on it.
#[derive(Debug)]
pub struct SharedMap<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> SharedMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Create an empty map sized for roughly `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// The number of entries currently stored.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the map currently holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Snapshot read of the value for `key`.
    pub async fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.lock().await.get(key).cloned()
    }

    /// Unconditionally insert or overwrite the value for `key`.
    pub async fn insert(&self, key: K, value: V) {
        self.inner.lock().await.insert(key, value);
    }

    /// Overwrite the value for `key` only if the key is present.
    ///
    /// Returns `false`, changing nothing, when the key is absent, so a
    /// caller can tell an overwrite from a race with a removal.
    pub async fn update(&self, key: &K, value: V) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Overwrite the value for `key` only if it is present and currently
    /// equal to `expected`.
    ///
    /// Returns `false`, changing nothing, when the key is absent or its
    /// value differs. This is what makes a repeated release detectable: the
    /// second caller sees the entry already in its target state.
    pub async fn compare_and_update(&self, key: &K, expected: &V, value: V) -> bool
    where
        V: PartialEq,
    {
        let mut inner = self.inner.lock().await;
        match inner.get_mut(key) {
            Some(slot) if *slot == *expected => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    /// Atomically remove the entry for `key`, returning its prior value.
    ///
    /// Because read and removal happen under one critical section, two racing
    /// callers can never both observe the entry as present.
    pub async fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().await.remove(key)
    }

    /// Take the table's exclusive lock for a compound operation.
    ///
    /// The escape hatch: while the guard is held, no other operation on the
    /// map can run, so multi-step sequences like "scan for a matching entry,
    /// else insert a new one" or "drain every entry exactly once" behave as a
    /// single atomic unit.
    pub async fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.inner.lock().await
    }
}

impl<K: Eq + Hash, V> Default for SharedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
