use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{StoreError, StoreResult};

/// Width of one shard segment, in hex characters.
pub const BLOCK_SIZE: usize = 5;

/// Where a key lives on disk, relative to the store root.
///
/// `path_name` is one or more `/`-joined directory segments and `file_name`
/// is the leaf. The blob for a key is stored at
/// `root/<path_name>/<file_name>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathKey {
    pub path_name: String,
    pub file_name: String,
}

impl PathKey {
    pub fn new(path_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            path_name: path_name.into(),
            file_name: file_name.into(),
        }
    }

    /// The top-level shard directory. Deleting a key removes this whole tree.
    pub fn first_path_name(&self) -> &str {
        self.path_name.split('/').next().unwrap_or_default()
    }

    /// Textual `path_name/file_name`, relative to the store root.
    pub fn file_path(&self) -> String {
        format!("{}/{}", self.path_name, self.file_name)
    }

    /// Absolute location of the blob under `root`.
    pub fn full_path(&self, root: &Path) -> PathBuf {
        root.join(&self.path_name).join(&self.file_name)
    }

    /// Directory that must exist before the blob can be created.
    pub fn dir_path(&self, root: &Path) -> PathBuf {
        root.join(&self.path_name)
    }

    /// Reject descriptors that would resolve outside the store root.
    ///
    /// Only the identity transform can produce these; CAS descriptors are
    /// always plain hex.
    pub(crate) fn validate(&self, key: &str) -> StoreResult<()> {
        let invalid = |reason| {
            Err(StoreError::InvalidKey {
                key: key.to_string(),
                reason,
            })
        };

        if self.path_name.starts_with('/') {
            return invalid("absolute path");
        }
        if self.first_path_name().is_empty() {
            return invalid("empty shard segment");
        }
        if self.path_name.split('/').any(|s| s == "." || s == "..") {
            return invalid("relative path segment");
        }
        if self.file_name.is_empty()
            || self.file_name.contains('/')
            || self.file_name == "."
            || self.file_name == ".."
        {
            return invalid("bad file name");
        }
        Ok(())
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_path())
    }
}

/// Maps the key verbatim: `path_name = key`, `file_name = key`.
pub fn identity_path_transform(key: &str) -> PathKey {
    PathKey::new(key, key)
}

/// Content-addressed layout.
///
/// The SHA-1 of the key is hex encoded and split into 5-character shard
/// segments. The segment list carries one unfilled trailing slot, so the
/// joined path ends in `/`. On-disk layouts written by existing nodes depend
/// on this exact string.
pub fn cas_path_transform(key: &str) -> PathKey {
    let digest = Sha1::digest(key.as_bytes());
    let hash_str = hex::encode(digest);

    let block_count = hash_str.len() / BLOCK_SIZE;
    let mut segments = Vec::with_capacity(block_count + 1);
    for i in 0..block_count {
        segments.push(&hash_str[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE]);
    }
    segments.push("");

    PathKey {
        path_name: segments.join("/"),
        file_name: hash_str,
    }
}

/// Selectable key-to-path strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathTransform {
    /// Key used directly as directory and file name.
    #[default]
    Identity,
    /// SHA-1 sharded layout.
    #[serde(rename = "cas")]
    ContentAddressed,
}

impl PathTransform {
    pub fn apply(&self, key: &str) -> PathKey {
        match self {
            Self::Identity => identity_path_transform(key),
            Self::ContentAddressed => cas_path_transform(key),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::ContentAddressed => "cas",
        }
    }
}

impl fmt::Display for PathTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PathTransform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Self::Identity),
            "cas" => Ok(Self::ContentAddressed),
            other => Err(format!("unknown path transform: {other} (expected identity or cas)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cas_transform_canonical_vector() {
        let key = cas_path_transform("SomeRandomKey");
        assert_eq!(key.file_name, "dc2a1164e7b8e5ad09fb8e12c4040e584a3e5867");
        assert_eq!(key.path_name, "dc2a1/164e7/b8e5a/d09fb/8e12c/4040e/584a3/e5867/");
    }

    #[test]
    fn cas_transform_shape() {
        let key = cas_path_transform("anything at all");
        assert_eq!(key.file_name.len(), 40);
        assert!(key.path_name.ends_with('/'));
        // 8 filled segments plus the empty trailing one
        let segments: Vec<&str> = key.path_name.split('/').collect();
        assert_eq!(segments.len(), 9);
        assert!(segments[..8].iter().all(|s| s.len() == BLOCK_SIZE));
        assert_eq!(segments[8], "");
        assert_eq!(key.path_name.replace('/', ""), key.file_name);
    }

    #[test]
    fn first_path_name_is_first_segment() {
        let key = cas_path_transform("SomeRandomKey");
        assert_eq!(key.first_path_name(), "dc2a1");
        assert_eq!(identity_path_transform("photos").first_path_name(), "photos");
    }

    #[test]
    fn file_path_keeps_double_separator() {
        let key = cas_path_transform("SomeRandomKey");
        assert_eq!(
            key.file_path(),
            "dc2a1/164e7/b8e5a/d09fb/8e12c/4040e/584a3/e5867//dc2a1164e7b8e5ad09fb8e12c4040e584a3e5867"
        );
    }

    #[test]
    fn full_path_resolves_under_root() {
        let key = cas_path_transform("SomeRandomKey");
        let path = key.full_path(Path::new("/data"));
        assert_eq!(
            path,
            PathBuf::from(
                "/data/dc2a1/164e7/b8e5a/d09fb/8e12c/4040e/584a3/e5867/dc2a1164e7b8e5ad09fb8e12c4040e584a3e5867"
            )
        );
    }

    #[test]
    fn identity_transform() {
        let key = identity_path_transform("hello");
        assert_eq!(key, PathKey::new("hello", "hello"));
    }

    #[test]
    fn validate_rejects_escaping_keys() {
        for bad in ["", "/etc/passwd", "..", "a/../b", "./x"] {
            let key = identity_path_transform(bad);
            assert!(
                matches!(key.validate(bad), Err(StoreError::InvalidKey { .. })),
                "{bad:?} should be rejected"
            );
        }
        assert!(identity_path_transform("plain").validate("plain").is_ok());
        assert!(cas_path_transform("../../x").validate("../../x").is_ok());
    }

    #[test]
    fn transform_from_str_and_display() {
        assert_eq!("cas".parse::<PathTransform>().unwrap(), PathTransform::ContentAddressed);
        assert_eq!("identity".parse::<PathTransform>().unwrap(), PathTransform::Identity);
        assert!("sha256".parse::<PathTransform>().is_err());
        assert_eq!(PathTransform::ContentAddressed.to_string(), "cas");
        assert_eq!(PathTransform::default(), PathTransform::Identity);
    }

    proptest! {
        #[test]
        fn transforms_are_deterministic(key in ".*") {
            prop_assert_eq!(cas_path_transform(&key), cas_path_transform(&key));
            prop_assert_eq!(identity_path_transform(&key), identity_path_transform(&key));
        }

        #[test]
        fn cas_descriptor_always_valid(key in ".*") {
            prop_assert!(cas_path_transform(&key).validate(&key).is_ok());
        }
    }
}
