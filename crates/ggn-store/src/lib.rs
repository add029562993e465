//! Content-addressed blob storage for GG Network nodes.
//!
//! A store owns a root directory and maps every logical key to a file under
//! it through a [`PathTransform`]. With the content-addressed transform a key
//! is hashed with SHA-1 and the hex digest is sharded into 5-character
//! directory levels, which bounds the fan-out of any single directory:
//!
//! ```text
//! SomeRandomKey -> dc2a1/164e7/b8e5a/d09fb/8e12c/4040e/584a3/e5867/dc2a1164e7b8e5ad09fb8e12c4040e584a3e5867
//! ```
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`DiskStore`] -- the filesystem layout above
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Path resolution is pure: a key always maps to the same location.
//! 2. Blob bytes are stored verbatim, with no header or checksum.
//! 3. Deletion removes the key's whole top-level shard.
//! 4. Stores take no locks; concurrent writers to one key race.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod disk;
pub mod error;
pub mod memory;
pub mod path;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use disk::{DiskStore, StoreConfig, DEFAULT_ROOT};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBlobStore;
pub use path::{cas_path_transform, identity_path_transform, PathKey, PathTransform};
pub use traits::BlobStore;
