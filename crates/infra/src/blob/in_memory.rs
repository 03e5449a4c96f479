use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{BlobStore, BlobStoreError, DirOutcome};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// In-memory blob store.
///
/// Intended for tests/dev. Directories are explicit nodes, so a write into a
/// directory that was never created fails the same way it does on disk.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a payload at `path` without any parent checks (test setup helper).
    pub fn insert_raw(
        &self,
        path: impl Into<PathBuf>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<(), BlobStoreError> {
        let mut nodes = self.nodes.write().map_err(|_| BlobStoreError::Poisoned)?;
        nodes.insert(path.into(), Node::File(bytes.into()));
        Ok(())
    }

    /// Drop a single entry, as an external cleaner would. `true` if it existed.
    pub fn remove_raw(&self, path: &Path) -> Result<bool, BlobStoreError> {
        let mut nodes = self.nodes.write().map_err(|_| BlobStoreError::Poisoned)?;
        Ok(nodes.remove(path).is_some())
    }
}

fn not_a_directory(path: &Path, what: &str) -> BlobStoreError {
    BlobStoreError::io(path, std::io::Error::other(what.to_string()))
}

impl BlobStore for InMemoryBlobStore {
    fn ensure_dir(
        &self,
        path: &Path,
        fail_if_wrong_type: bool,
    ) -> Result<DirOutcome, BlobStoreError> {
        let mut nodes = self.nodes.write().map_err(|_| BlobStoreError::Poisoned)?;

        match nodes.get(path) {
            Some(Node::Dir) => return Ok(DirOutcome::Existing),
            Some(Node::File(_)) if fail_if_wrong_type => {
                return Err(BlobStoreError::WrongType(path.to_path_buf()));
            }
            Some(Node::File(_)) => return Ok(DirOutcome::WrongTypeIgnored),
            None => {}
        }

        // Like `create_dir_all`: every ancestor must be (or become) a directory.
        let ancestors: Vec<&Path> = path
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        for ancestor in &ancestors {
            if let Some(Node::File(_)) = nodes.get(*ancestor) {
                return Err(not_a_directory(ancestor, "ancestor is a file"));
            }
        }
        for ancestor in ancestors {
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }

        Ok(DirOutcome::Created)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), BlobStoreError> {
        let mut nodes = self.nodes.write().map_err(|_| BlobStoreError::Poisoned)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            match nodes.get(parent) {
                Some(Node::Dir) => {}
                Some(Node::File(_)) => return Err(not_a_directory(parent, "parent is a file")),
                None => {
                    return Err(BlobStoreError::io(
                        path,
                        std::io::Error::new(ErrorKind::NotFound, "parent directory missing"),
                    ));
                }
            }
        }
        if let Some(Node::Dir) = nodes.get(path) {
            return Err(not_a_directory(path, "is a directory"));
        }

        nodes.insert(path.to_path_buf(), Node::File(bytes.to_vec()));
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, BlobStoreError> {
        let nodes = self.nodes.read().map_err(|_| BlobStoreError::Poisoned)?;

        match nodes.get(path) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Dir) => Err(BlobStoreError::WrongType(path.to_path_buf())),
            None => Err(BlobStoreError::NotFound(path.to_path_buf())),
        }
    }

    fn list(&self, path: &Path) -> Result<BTreeSet<String>, BlobStoreError> {
        let nodes = self.nodes.read().map_err(|_| BlobStoreError::Poisoned)?;

        match nodes.get(path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(BlobStoreError::WrongType(path.to_path_buf())),
            None => return Err(BlobStoreError::NotFound(path.to_path_buf())),
        }

        // Descendants sort contiguously right after the directory itself.
        let names = nodes
            .range(path.to_path_buf()..)
            .skip(1)
            .take_while(|(p, _)| p.starts_with(path))
            .filter(|(p, _)| p.parent() == Some(path))
            .filter_map(|(p, _)| p.file_name().and_then(|n| n.to_str()).map(str::to_owned))
            .collect();

        Ok(names)
    }
}
