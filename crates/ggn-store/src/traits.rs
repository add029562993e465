use std::io::{Cursor, Read};

use crate::error::StoreResult;

/// Key-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - A key always resolves to the same location (the path transform is pure).
/// - `read` after a successful `write` returns exactly the written bytes.
/// - `delete` works at shard granularity: every key sharing the deleted key's
///   first path segment is removed with it.
/// - No locking is done; callers serialize concurrent access to one key.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// Copy all of `reader` into the blob for `key`, replacing any previous
    /// content. Returns the number of bytes written.
    ///
    /// Not transactional: a failure mid-copy leaves a partial blob behind.
    fn write(&self, key: &str, reader: &mut dyn Read) -> StoreResult<u64>;

    /// Load the whole blob for `key` into memory.
    ///
    /// Returns `Err(StoreError::NotFound)` if nothing is stored under `key`.
    fn read(&self, key: &str) -> StoreResult<Cursor<Vec<u8>>>;

    /// Check whether a blob exists for `key`.
    fn has(&self, key: &str) -> StoreResult<bool>;

    /// Remove the top-level shard containing `key`.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Convenience wrapper around [`write`](Self::write) for in-memory data.
    fn write_bytes(&self, key: &str, data: &[u8]) -> StoreResult<u64> {
        let mut reader = data;
        self.write(key, &mut reader)
    }

    /// Convenience wrapper around [`read`](Self::read) returning the bytes.
    fn read_bytes(&self, key: &str) -> StoreResult<Vec<u8>> {
        Ok(self.read(key)?.into_inner())
    }
}
