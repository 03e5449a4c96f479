//! Local filesystem blob store.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use super::{BlobStore, BlobStoreError, DirOutcome};

/// Prefix of in-flight temp files; never reported by `list`.
const TEMP_PREFIX: &str = ".~tmp.";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Blob store over `std::fs`.
///
/// Overwrites go through a temp file in the same directory followed by a
/// rename, so readers see either the old or the new payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsBlobStore;

impl FsBlobStore {
    pub fn new() -> Self {
        Self
    }

    fn temp_path_for(path: &Path) -> Result<PathBuf, BlobStoreError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                BlobStoreError::io(
                    path,
                    std::io::Error::new(ErrorKind::InvalidInput, "path has no file name"),
                )
            })?;
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        Ok(path.with_file_name(format!(
            "{TEMP_PREFIX}{name}.{}.{seq}",
            std::process::id()
        )))
    }

    /// Fill a fresh temp file with `fill`, then rename it over `path`. The
    /// temp file is removed on any failure.
    fn replace_with<F>(path: &Path, fill: F) -> Result<(), BlobStoreError>
    where
        F: FnOnce(&mut File) -> std::io::Result<()>,
    {
        let temp = Self::temp_path_for(path)?;
        let result = File::create(&temp)
            .and_then(|mut file| fill(&mut file))
            .and_then(|()| std::fs::rename(&temp, path));

        if let Err(err) = result {
            if let Err(cleanup) = std::fs::remove_file(&temp) {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(temp = %temp.display(), error = %cleanup, "could not remove temp file");
                }
            }
            return Err(BlobStoreError::io(path, err));
        }
        Ok(())
    }
}

fn map_io(path: &Path, err: std::io::Error) -> BlobStoreError {
    if err.kind() == ErrorKind::NotFound {
        BlobStoreError::NotFound(path.to_path_buf())
    } else {
        BlobStoreError::io(path, err)
    }
}

impl BlobStore for FsBlobStore {
    fn ensure_dir(
        &self,
        path: &Path,
        fail_if_wrong_type: bool,
    ) -> Result<DirOutcome, BlobStoreError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(DirOutcome::Existing),
            Ok(_) if fail_if_wrong_type => Err(BlobStoreError::WrongType(path.to_path_buf())),
            Ok(_) => Ok(DirOutcome::WrongTypeIgnored),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                std::fs::create_dir_all(path).map_err(|e| BlobStoreError::io(path, e))?;
                Ok(DirOutcome::Created)
            }
            Err(err) => Err(BlobStoreError::io(path, err)),
        }
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), BlobStoreError> {
        Self::replace_with(path, |file| file.write_all(bytes))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, BlobStoreError> {
        std::fs::read(path).map_err(|e| map_io(path, e))
    }

    fn list(&self, path: &Path) -> Result<BTreeSet<String>, BlobStoreError> {
        let meta = std::fs::metadata(path).map_err(|e| map_io(path, e))?;
        if !meta.is_dir() {
            return Err(BlobStoreError::WrongType(path.to_path_buf()));
        }

        let mut names = BTreeSet::new();
        for entry in std::fs::read_dir(path).map_err(|e| map_io(path, e))? {
            let entry = entry.map_err(|e| BlobStoreError::io(path, e))?;
            match entry.file_name().into_string() {
                Ok(name) if name.starts_with(TEMP_PREFIX) => {}
                Ok(name) => {
                    names.insert(name);
                }
                Err(raw) => warn!(dir = %path.display(), name = ?raw, "skipping non-UTF-8 entry"),
            }
        }
        Ok(names)
    }
}
