//! Blob-store backed implementation of [`JobLogging`].

use std::path::Path;

use tracing::{debug, info, warn};

use jobrec_core::{JobId, JobState, LogEntry, ScriptMetadata, StateRecord};

use super::{JobLogging, LOG_SEPARATOR, RecordStoreError};
use crate::blob::{BlobStore, BlobStoreError, DirOutcome};
use crate::codec::{JsonCodec, MetadataCodec};
use crate::config::StoreConfig;
use crate::pagination::{Direction, paginate};
use crate::paths::{PathScheme, RecordKind, log_key};

/// Job record store over a [`BlobStore`].
#[derive(Debug)]
pub struct JobRecordStore<B, C = JsonCodec> {
    blob: B,
    codec: C,
    paths: PathScheme,
}

impl<B> JobRecordStore<B, JsonCodec>
where
    B: BlobStore,
{
    /// Bootstrap the record roots and return a usable store (JSON metadata).
    pub fn open(config: StoreConfig, blob: B) -> Result<Self, RecordStoreError> {
        Self::open_with_codec(config, blob, JsonCodec)
    }
}

impl<B, C> JobRecordStore<B, C>
where
    B: BlobStore,
    C: MetadataCodec,
{
    /// Bootstrap the record roots and return a usable store.
    ///
    /// Each root is created if absent and accepted if already a directory. A
    /// root that exists as something else aborts startup unless
    /// `config.forced` is set. Any storage failure here is fatal.
    pub fn open_with_codec(
        config: StoreConfig,
        blob: B,
        codec: C,
    ) -> Result<Self, RecordStoreError> {
        let paths = PathScheme::new(&config)?;

        for kind in RecordKind::ALL {
            let root = paths.root(kind);
            match blob.ensure_dir(root, !config.forced) {
                Ok(DirOutcome::Created) => {
                    info!(kind = %kind, root = %root.display(), "created record root")
                }
                Ok(DirOutcome::Existing) => {
                    debug!(kind = %kind, root = %root.display(), "record root already present")
                }
                Ok(DirOutcome::WrongTypeIgnored) => warn!(
                    kind = %kind,
                    root = %root.display(),
                    "record root is not a directory; continuing in forced mode"
                ),
                Err(source) => return Err(RecordStoreError::Bootstrap { kind, source }),
            }
        }

        Ok(Self { blob, codec, paths })
    }

    fn read_record(&self, kind: RecordKind, job_id: &JobId) -> Result<Vec<u8>, RecordStoreError> {
        let path = self.paths.path_for(kind, job_id);
        self.blob.read(&path).map_err(|err| match err {
            BlobStoreError::NotFound(_) => RecordStoreError::NotFound {
                kind,
                job_id: job_id.clone(),
            },
            other => RecordStoreError::Storage(other),
        })
    }

    fn read_text(&self, kind: RecordKind, job_id: &JobId) -> Result<String, RecordStoreError> {
        let bytes = self.read_record(kind, job_id)?;
        String::from_utf8(bytes).map_err(|e| RecordStoreError::InvalidEncoding {
            kind,
            job_id: job_id.clone(),
            reason: e.to_string(),
        })
    }

    /// Read an entry that a directory listing just reported. `None` when it
    /// is gone (or is not a file) by the time we get to it.
    fn read_listed(&self, path: &Path) -> Result<Option<Vec<u8>>, RecordStoreError> {
        match self.blob.read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(BlobStoreError::NotFound(_)) => {
                debug!(path = %path.display(), "listed entry vanished before read");
                Ok(None)
            }
            Err(BlobStoreError::WrongType(_)) => {
                warn!(path = %path.display(), "listed entry is not a file; skipping");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn parse_state(job_id: &JobId, text: &str) -> Result<JobState, RecordStoreError> {
        text.parse().map_err(|e: jobrec_core::DomainError| RecordStoreError::InvalidEncoding {
            kind: RecordKind::State,
            job_id: job_id.clone(),
            reason: e.to_string(),
        })
    }
}

/// Encode a log line as `source_tag + LOG_SEPARATOR + message`.
pub(crate) fn encode_log(source_tag: &str, message: &str) -> String {
    format!("{source_tag}{LOG_SEPARATOR}{message}")
}

/// Decode a stored log line. Exactly one separator is required; anything
/// else (or a key that is not a decimal timestamp) yields `None`.
pub(crate) fn decode_log(key: &str, bytes: &[u8]) -> Option<LogEntry> {
    let timestamp = key.parse::<i64>().ok()?;
    let text = std::str::from_utf8(bytes).ok()?;

    let mut parts = text.split(LOG_SEPARATOR);
    let (source_tag, message) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    Some(LogEntry::new(source_tag, message, timestamp))
}

impl<B, C> JobLogging for JobRecordStore<B, C>
where
    B: BlobStore,
    C: MetadataCodec,
{
    fn set_state(&self, job_id: &JobId, state: JobState) -> Result<(), RecordStoreError> {
        debug!(job_id = %job_id, state = %state, "writing job state");
        let path = self.paths.path_for(RecordKind::State, job_id);
        self.blob.write(&path, state.as_str().as_bytes())?;
        Ok(())
    }

    fn get_state(&self, job_id: &JobId) -> Result<JobState, RecordStoreError> {
        info!(job_id = %job_id, "reading job state");
        let text = self.read_text(RecordKind::State, job_id)?;
        Self::parse_state(job_id, &text)
    }

    fn set_script_details(&self, job_id: &JobId, details: &str) -> Result<(), RecordStoreError> {
        info!(job_id = %job_id, bytes = details.len(), "writing script details");
        let path = self.paths.path_for(RecordKind::Details, job_id);
        self.blob.write(&path, details.as_bytes())?;
        Ok(())
    }

    fn get_script_details(&self, job_id: &JobId) -> Result<String, RecordStoreError> {
        info!(job_id = %job_id, "reading script details");
        self.read_text(RecordKind::Details, job_id)
    }

    fn add_log(
        &self,
        job_id: &JobId,
        source_tag: &str,
        timestamp: i64,
        message: &str,
    ) -> Result<(), RecordStoreError> {
        debug!(job_id = %job_id, source_tag, timestamp, "writing log line");

        if source_tag.contains(LOG_SEPARATOR) || message.contains(LOG_SEPARATOR) {
            warn!(
                job_id = %job_id,
                timestamp,
                separator = LOG_SEPARATOR,
                "log line contains the separator and will be skipped when read back"
            );
        }

        self.blob.ensure_dir(&self.paths.log_dir(job_id), true)?;
        let path = self.paths.log_entry(job_id, timestamp);
        self.blob.write(&path, encode_log(source_tag, message).as_bytes())?;
        Ok(())
    }

    fn get_logs(
        &self,
        job_id: &JobId,
        from_timestamp: i64,
        limit: usize,
    ) -> Result<Vec<LogEntry>, RecordStoreError> {
        info!(job_id = %job_id, from_timestamp, limit, "reading logs");

        let dir = self.paths.log_dir(job_id);
        let keys = match self.blob.list(&dir) {
            Ok(keys) => keys,
            Err(BlobStoreError::NotFound(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let cursor = log_key(from_timestamp);
        let page = paginate(&keys, Direction::Ascending, Some(&cursor), limit);

        let mut logs = Vec::with_capacity(page.len());
        for key in page {
            let Some(bytes) = self.read_listed(&dir.join(&key))? else {
                continue;
            };
            match decode_log(&key, &bytes) {
                Some(entry) => logs.push(entry),
                None => warn!(job_id = %job_id, key = %key, "skipping malformed log line"),
            }
        }

        Ok(logs)
    }

    fn get_state_of_jobs(
        &self,
        start: Option<&JobId>,
        limit: usize,
    ) -> Result<Vec<StateRecord>, RecordStoreError> {
        info!(start = ?start.map(JobId::as_str), limit, "reading states of jobs");

        let root = self.paths.root(RecordKind::State);
        let names = self.blob.list(root)?;
        let page = paginate(&names, Direction::Descending, start.map(JobId::as_str), limit);

        let mut states = Vec::with_capacity(page.len());
        for name in page {
            let job_id = match JobId::new(name.as_str()) {
                Ok(id) => id,
                Err(err) => {
                    warn!(name = %name, error = %err, "skipping state entry with invalid job id");
                    continue;
                }
            };
            let Some(bytes) = self.read_listed(&root.join(&name))? else {
                continue;
            };
            let text = String::from_utf8(bytes).map_err(|e| RecordStoreError::InvalidEncoding {
                kind: RecordKind::State,
                job_id: job_id.clone(),
                reason: e.to_string(),
            })?;
            let state = Self::parse_state(&job_id, &text)?;
            states.push(StateRecord::new(job_id, state));
        }

        Ok(states)
    }

    fn set_meta_info(
        &self,
        job_id: &JobId,
        metadata: &ScriptMetadata,
    ) -> Result<(), RecordStoreError> {
        info!(job_id = %job_id, "writing script metainfo");
        let bytes = self.codec.encode(metadata)?;
        let path = self.paths.path_for(RecordKind::MetaInfo, job_id);
        self.blob.write(&path, &bytes)?;
        Ok(())
    }

    fn get_meta_info(&self, job_id: &JobId) -> Result<ScriptMetadata, RecordStoreError> {
        info!(job_id = %job_id, "reading script metainfo");
        let bytes = self.read_record(RecordKind::MetaInfo, job_id)?;
        Ok(self.codec.decode(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_line_encoding() {
        assert_eq!(encode_log("stage-1", "hello"), "stage-1-----hello");
        assert_eq!(
            decode_log("42", b"stage-1-----hello"),
            Some(LogEntry::new("stage-1", "hello", 42))
        );
    }

    #[test]
    fn log_line_needs_exactly_one_separator() {
        assert_eq!(decode_log("1", b"no separator here"), None);
        assert_eq!(decode_log("1", b"a-----b-----c"), None);
        assert_eq!(decode_log("1", b"tag-----"), Some(LogEntry::new("tag", "", 1)));
    }

    #[test]
    fn log_key_must_be_a_timestamp() {
        assert_eq!(decode_log("not-a-number", b"a-----b"), None);
        assert_eq!(decode_log("-7", b"a-----b"), Some(LogEntry::new("a", "b", -7)));
    }

    #[test]
    fn message_with_dashes_below_separator_length_survives() {
        let entry = decode_log("5", encode_log("t", "a--b----c").as_bytes()).unwrap();
        assert_eq!(entry.message, "a--b----c");
    }
}
