use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// One mutex per shard, created on demand and dropped when unused.
///
/// Store deletion removes a whole shard, so serializing per shard rather than
/// per key also orders a delete against writes to sibling keys.
#[derive(Debug, Default)]
pub struct ShardLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ShardLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `shard`.
    ///
    /// A panic inside `f` does not wedge the shard; the next caller takes the
    /// lock as usual.
    pub fn with_lock<T>(&self, shard: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut map = self.locks.lock().expect("shard lock map poisoned");
            Arc::clone(map.entry(shard.to_string()).or_default())
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut map = self.locks.lock().expect("shard lock map poisoned");
        drop(lock);
        // Clones are only taken and released under the map lock, so a count
        // of one means nobody is holding or waiting.
        if map.get(shard).is_some_and(|l| Arc::strong_count(l) == 1) {
            map.remove(shard);
        }
        result
    }

    /// Number of shards with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().expect("shard lock map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
