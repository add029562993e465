use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::path::{PathKey, PathTransform};
use crate::traits::BlobStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Blobs are keyed by their [`PathKey`] so
/// shard-level deletion behaves exactly like [`DiskStore`](crate::DiskStore).
pub struct InMemoryBlobStore {
    transform: PathTransform,
    blobs: RwLock<HashMap<PathKey, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty store using `transform` to resolve keys.
    pub fn new(transform: PathTransform) -> Self {
        Self {
            transform,
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Remove all blobs from the store.
    pub fn clear(&self) {
        self.blobs.write().expect("lock poisoned").clear();
    }

    fn path_key(&self, key: &str) -> StoreResult<PathKey> {
        let path_key = self.transform.apply(key);
        path_key.validate(key)?;
        Ok(path_key)
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new(PathTransform::default())
    }
}

impl BlobStore for InMemoryBlobStore {
    fn write(&self, key: &str, reader: &mut dyn Read) -> StoreResult<u64> {
        let path_key = self.path_key(key)?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let written = data.len() as u64;
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(path_key, data);
        Ok(written)
    }

    fn read(&self, key: &str) -> StoreResult<Cursor<Vec<u8>>> {
        let path_key = self.path_key(key)?;
        let map = self.blobs.read().expect("lock poisoned");
        map.get(&path_key)
            .map(|data| Cursor::new(data.clone()))
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn has(&self, key: &str) -> StoreResult<bool> {
        let path_key = self.path_key(key)?;
        Ok(self
            .blobs
            .read()
            .expect("lock poisoned")
            .contains_key(&path_key))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let path_key = self.path_key(key)?;
        let shard = path_key.first_path_name();
        self.blobs
            .write()
            .expect("lock poisoned")
            .retain(|k, _| k.first_path_name() != shard);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("transform", &self.transform)
            .field("blob_count", &self.len())
            .finish()
    }
}
