//! Hierarchical blob storage boundary.
//!
//! The record store's only persistence primitive: named paths holding opaque
//! bytes, directories that can be listed, nothing else. No transactions, no
//! secondary indexes; ordering comes from entry names alone.

pub mod fs;
pub mod in_memory;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub use fs::FsBlobStore;
pub use in_memory::InMemoryBlobStore;

/// What `ensure_dir` found (or did) at a path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DirOutcome {
    /// The directory was absent and has been created.
    Created,
    /// A directory was already there.
    Existing,
    /// Something other than a directory is there; tolerated on request.
    WrongTypeIgnored,
}

/// Blob store operation error.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("path exists but has the wrong type: {}", .0.display())]
    WrongType(PathBuf),

    #[error("i/o failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lock poisoned")]
    Poisoned,
}

impl BlobStoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobStoreError::NotFound(_))
    }
}

/// Hierarchical namespace of byte payloads.
///
/// All calls are blocking. Concurrent writers to the same path race; the last
/// write to complete wins.
pub trait BlobStore: Send + Sync {
    /// Make sure `path` is a directory, creating it (and its parents) if absent.
    ///
    /// When something other than a directory already sits at `path`, this
    /// fails with `WrongType` if `fail_if_wrong_type` is set and reports
    /// `DirOutcome::WrongTypeIgnored` otherwise.
    fn ensure_dir(&self, path: &Path, fail_if_wrong_type: bool)
    -> Result<DirOutcome, BlobStoreError>;

    /// Write `bytes` to `path`, replacing any previous content.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), BlobStoreError>;

    /// Read the whole payload at `path`.
    fn read(&self, path: &Path) -> Result<Vec<u8>, BlobStoreError>;

    /// Names (not full paths) of the entries directly under `path`.
    fn list(&self, path: &Path) -> Result<BTreeSet<String>, BlobStoreError>;
}

impl<S> BlobStore for Arc<S>
where
    S: BlobStore + ?Sized,
{
    fn ensure_dir(
        &self,
        path: &Path,
        fail_if_wrong_type: bool,
    ) -> Result<DirOutcome, BlobStoreError> {
        (**self).ensure_dir(path, fail_if_wrong_type)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), BlobStoreError> {
        (**self).write(path, bytes)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, BlobStoreError> {
        (**self).read(path)
    }

    fn list(&self, path: &Path) -> Result<BTreeSet<String>, BlobStoreError> {
        (**self).list(path)
    }
}
