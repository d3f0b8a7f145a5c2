//! Keyed cache of idle connections.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Map from `"host-port"` to at most one idle connection.
///
/// Acquiring a connection moves it out of the pool; releasing moves it
/// back. A single coarse mutex makes check-then-insert atomic, which is
/// all the first-wins policy needs.
#[derive(Debug)]
pub struct ConnectionPool<T> {
    idle: Mutex<HashMap<String, T>>,
}

impl<T> ConnectionPool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            idle: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, T>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes and returns the cached connection for `key`, if any.
    pub fn take(&self, key: &str) -> Option<T> {
        self.lock().remove(key)
    }

    /// Caches `conn` under `key` unless a connection is already cached there.
    ///
    /// Returns the rejected connection when the slot was occupied; the
    /// cached one is never replaced.
    pub fn put_if_vacant(&self, key: String, conn: T) -> Option<T> {
        let mut idle = self.lock();
        if idle.contains_key(&key) {
            return Some(conn);
        }
        idle.insert(key, conn);
        None
    }

    /// Empties the pool and returns everything it held.
    pub fn drain(&self) -> Vec<T> {
        self.lock().drain().map(|(_, conn)| conn).collect()
    }

    /// Number of cached connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> Default for ConnectionPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
