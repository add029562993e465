use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::path::{PathKey, PathTransform};
use crate::traits::BlobStore;

/// Root directory used when none is configured.
pub const DEFAULT_ROOT: &str = "ggnetwork";

/// Configuration for a [`DiskStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory that holds every shard.
    pub root: PathBuf,
    /// Key-to-path strategy.
    pub transform: PathTransform,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            transform: PathTransform::default(),
        }
    }
}

/// Filesystem-backed blob store.
///
/// Blobs are written verbatim to `root/<path_name>/<file_name>` with no header,
/// checksum or sidecar file.
#[derive(Clone, Debug)]
pub struct DiskStore {
    root: PathBuf,
    transform: PathTransform,
}

impl DiskStore {
    /// Create a store. An empty root falls back to [`DEFAULT_ROOT`].
    ///
    /// Nothing is touched on disk until the first write.
    pub fn new(config: StoreConfig) -> Self {
        let root = if config.root.as_os_str().is_empty() {
            PathBuf::from(DEFAULT_ROOT)
        } else {
            config.root
        };
        Self {
            root,
            transform: config.transform,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn transform(&self) -> PathTransform {
        self.transform
    }

    /// Resolve and validate the descriptor for `key`.
    pub fn path_key(&self, key: &str) -> StoreResult<PathKey> {
        let path_key = self.transform.apply(key);
        path_key.validate(key)?;
        Ok(path_key)
    }

    /// Remove the entire store root. A missing root is not an error.
    pub fn clear(&self) -> StoreResult<()> {
        remove_tree(&self.root)?;
        debug!(root = %self.root.display(), "cleared store");
        Ok(())
    }
}

impl BlobStore for DiskStore {
    fn write(&self, key: &str, reader: &mut dyn Read) -> StoreResult<u64> {
        let path_key = self.path_key(key)?;
        fs::create_dir_all(path_key.dir_path(&self.root))?;

        let full_path = path_key.full_path(&self.root);
        let mut file = File::create(&full_path)?;
        let written = io::copy(reader, &mut file)?;

        debug!(bytes = written, path = %full_path.display(), "wrote blob");
        Ok(written)
    }

    fn read(&self, key: &str) -> StoreResult<Cursor<Vec<u8>>> {
        let path_key = self.path_key(key)?;
        let full_path = path_key.full_path(&self.root);

        let mut file = match File::open(&full_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        // The handle is dropped on return, whether or not the copy succeeded.
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(Cursor::new(buf))
    }

    fn has(&self, key: &str) -> StoreResult<bool> {
        let path_key = self.path_key(key)?;
        match fs::metadata(path_key.full_path(&self.root)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let path_key = self.path_key(key)?;
        let shard = self.root.join(path_key.first_path_name());
        remove_tree(&shard)?;
        debug!(file = %path_key.file_name, shard = %shard.display(), "deleted from disk");
        Ok(())
    }
}

/// `remove_dir_all` that treats an absent tree as already removed.
fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::cas_path_transform;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn cas_store() -> (TempDir, DiskStore) {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(StoreConfig {
            root: dir.path().join("store"),
            transform: PathTransform::ContentAddressed,
        });
        (dir, store)
    }

    /// Shares the first CAS shard (`dc2a1`) with `"SomeRandomKey"`.
    const SHARD_SIBLING: &str = "sibling-101051";

    #[test]
    fn write_read_has_delete_cycle() {
        let (_dir, store) = cas_store();
        let data = b"some data to write to file";

        for i in 0..50 {
            let key = format!("testing_key_{i}");
            assert!(!store.has(&key).unwrap());

            let n = store.write_bytes(&key, data).unwrap();
            assert_eq!(n, data.len() as u64);
            assert!(store.has(&key).unwrap(), "expected to have key {key}");

            assert_eq!(store.read_bytes(&key).unwrap(), data);

            store.delete(&key).unwrap();
            assert!(!store.has(&key).unwrap(), "key {key} should be gone");
        }
    }

    #[test]
    fn blob_lands_at_sharded_path() {
        let (_dir, store) = cas_store();
        store.write_bytes("SomeRandomKey", b"x").unwrap();
        let expected = store.root().join(
            "dc2a1/164e7/b8e5a/d09fb/8e12c/4040e/584a3/e5867/dc2a1164e7b8e5ad09fb8e12c4040e584a3e5867",
        );
        assert_eq!(fs::read(expected).unwrap(), b"x");
    }

    #[test]
    fn empty_and_binary_round_trip() {
        let (_dir, store) = cas_store();
        store.write_bytes("empty", b"").unwrap();
        assert!(store.has("empty").unwrap());
        assert!(store.read_bytes("empty").unwrap().is_empty());

        let binary: Vec<u8> = (0..=255u8).rev().chain([0xff, 0xfe, 0x00]).collect();
        store.write_bytes("binary", &binary).unwrap();
        assert_eq!(store.read_bytes("binary").unwrap(), binary);
    }

    #[test]
    fn write_truncates_previous_content() {
        let (_dir, store) = cas_store();
        store.write_bytes("k", b"a much longer first value").unwrap();
        store.write_bytes("k", b"short").unwrap();
        assert_eq!(store.read_bytes("k").unwrap(), b"short");
    }

    #[test]
    fn read_missing_key_is_not_found() {
        let (_dir, store) = cas_store();
        let err = store.read("nope").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(k) if k == "nope"));
    }

    #[test]
    fn delete_missing_key_is_ok() {
        let (_dir, store) = cas_store();
        store.delete("never-written").unwrap();
    }

    #[test]
    fn delete_removes_keys_sharing_first_shard() {
        let (_dir, store) = cas_store();
        let (k1, k2) = ("SomeRandomKey", SHARD_SIBLING);
        assert_eq!(
            cas_path_transform(k1).first_path_name(),
            cas_path_transform(k2).first_path_name()
        );

        store.write_bytes(k1, b"one").unwrap();
        store.write_bytes(k2, b"two").unwrap();
        assert!(store.has(k2).unwrap());

        store.delete(k1).unwrap();
        assert!(!store.has(k1).unwrap());
        assert!(!store.has(k2).unwrap());
    }

    #[test]
    fn delete_leaves_other_shards_alone() {
        let (_dir, store) = cas_store();
        let (k1, k2) = ("alpha", "beta");
        assert_ne!(
            cas_path_transform(k1).first_path_name(),
            cas_path_transform(k2).first_path_name()
        );

        store.write_bytes(k1, b"1").unwrap();
        store.write_bytes(k2, b"2").unwrap();
        store.delete(k1).unwrap();
        assert!(store.has(k2).unwrap());
    }

    #[test]
    fn identity_store_layout() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(StoreConfig {
            root: dir.path().to_path_buf(),
            transform: PathTransform::Identity,
        });
        store.write_bytes("notes", b"hello").unwrap();
        assert_eq!(fs::read(dir.path().join("notes/notes")).unwrap(), b"hello");
    }

    #[test]
    fn identity_store_rejects_escaping_key() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(StoreConfig {
            root: dir.path().join("root"),
            transform: PathTransform::Identity,
        });
        assert!(matches!(
            store.write_bytes("../outside", b"x"),
            Err(StoreError::InvalidKey { .. })
        ));
        assert!(matches!(store.delete(""), Err(StoreError::InvalidKey { .. })));
        assert!(!dir.path().join("outside").exists());
    }

    #[test]
    fn has_propagates_non_not_found_errors() {
        let dir = TempDir::new().unwrap();
        // A regular file where the shard directory should be turns the stat
        // into NotADirectory rather than NotFound.
        fs::write(dir.path().join("blocker"), b"file").unwrap();
        let store = DiskStore::new(StoreConfig {
            root: dir.path().join("blocker"),
            transform: PathTransform::Identity,
        });
        assert!(store.has("k").is_err());
    }

    #[test]
    fn clear_removes_root() {
        let (_dir, store) = cas_store();
        store.write_bytes("a", b"1").unwrap();
        store.clear().unwrap();
        assert!(!store.root().exists());
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn empty_root_falls_back_to_default() {
        let store = DiskStore::new(StoreConfig {
            root: PathBuf::new(),
            transform: PathTransform::ContentAddressed,
        });
        assert_eq!(store.root(), Path::new(DEFAULT_ROOT));
        assert_eq!(store.transform(), PathTransform::ContentAddressed);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn arbitrary_bytes_round_trip(key in "[a-zA-Z0-9_]{1,24}", data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let (_dir, store) = cas_store();
            store.write_bytes(&key, &data).unwrap();
            prop_assert_eq!(store.read_bytes(&key).unwrap(), data);
        }
    }
}
