//! Job record store: state, script details, log stream and metadata per job,
//! persisted as plain entries in a blob store.
//!
//! ## Design
//!
//! - One file per (kind, job) for state, details and metadata; writes overwrite.
//! - One directory per job for logs, one file per timestamp inside it.
//! - Listings page over directory entry names with [`crate::pagination`];
//!   logs ascend by timestamp key, job history descends by job id.
//! - No locking and no snapshots. A page is built from one directory listing
//!   followed by independent reads, so concurrent writers may add or remove
//!   entries in between. Entries that vanish before they are read are skipped.

pub mod store;

use std::sync::Arc;

use thiserror::Error;

use jobrec_core::{JobId, JobState, LogEntry, ScriptMetadata, StateRecord};

use crate::blob::BlobStoreError;
use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::paths::RecordKind;

pub use store::JobRecordStore;

/// Separates the source tag from the message inside a stored log line.
pub const LOG_SEPARATOR: &str = "-----";

/// Record store operation error.
#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("no {kind} record for job {job_id}")]
    NotFound { kind: RecordKind, job_id: JobId },

    #[error("invalid {kind} encoding for job {job_id}: {reason}")]
    InvalidEncoding {
        kind: RecordKind,
        job_id: JobId,
        reason: String,
    },

    #[error("metadata encoding failed: {0}")]
    Encoding(String),

    #[error("metadata decoding failed: {0}")]
    Decoding(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("bootstrap of {kind} root failed: {source}")]
    Bootstrap {
        kind: RecordKind,
        #[source]
        source: BlobStoreError,
    },

    #[error("storage error: {0}")]
    Storage(#[from] BlobStoreError),
}

impl From<CodecError> for RecordStoreError {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::Encode(msg) => RecordStoreError::Encoding(msg),
            CodecError::Decode(msg) => RecordStoreError::Decoding(msg),
        }
    }
}

/// Execution record of asynchronous jobs.
pub trait JobLogging: Send + Sync {
    /// Overwrite the job's current state.
    fn set_state(&self, job_id: &JobId, state: JobState) -> Result<(), RecordStoreError>;

    fn get_state(&self, job_id: &JobId) -> Result<JobState, RecordStoreError>;

    /// Overwrite the submitted script text, stored verbatim.
    fn set_script_details(&self, job_id: &JobId, details: &str) -> Result<(), RecordStoreError>;

    fn get_script_details(&self, job_id: &JobId) -> Result<String, RecordStoreError>;

    /// Append a log line keyed by `timestamp`. A line already stored at the
    /// same timestamp is replaced.
    fn add_log(
        &self,
        job_id: &JobId,
        source_tag: &str,
        timestamp: i64,
        message: &str,
    ) -> Result<(), RecordStoreError>;

    /// Up to `limit` log lines in ascending key order, starting at
    /// `from_timestamp` when such a line exists and at the first line
    /// otherwise. Lines that cannot be decoded are skipped.
    fn get_logs(
        &self,
        job_id: &JobId,
        from_timestamp: i64,
        limit: usize,
    ) -> Result<Vec<LogEntry>, RecordStoreError>;

    /// Up to `limit` job states in descending job-id order, starting at
    /// `start` when that job has a state and at the greatest id otherwise.
    fn get_state_of_jobs(
        &self,
        start: Option<&JobId>,
        limit: usize,
    ) -> Result<Vec<StateRecord>, RecordStoreError>;

    fn set_meta_info(
        &self,
        job_id: &JobId,
        metadata: &ScriptMetadata,
    ) -> Result<(), RecordStoreError>;

    fn get_meta_info(&self, job_id: &JobId) -> Result<ScriptMetadata, RecordStoreError>;
}

impl<S> JobLogging for Arc<S>
where
    S: JobLogging + ?Sized,
{
    fn set_state(&self, job_id: &JobId, state: JobState) -> Result<(), RecordStoreError> {
        (**self).set_state(job_id, state)
    }

    fn get_state(&self, job_id: &JobId) -> Result<JobState, RecordStoreError> {
        (**self).get_state(job_id)
    }

    fn set_script_details(&self, job_id: &JobId, details: &str) -> Result<(), RecordStoreError> {
        (**self).set_script_details(job_id, details)
    }

    fn get_script_details(&self, job_id: &JobId) -> Result<String, RecordStoreError> {
        (**self).get_script_details(job_id)
    }

    fn add_log(
        &self,
        job_id: &JobId,
        source_tag: &str,
        timestamp: i64,
        message: &str,
    ) -> Result<(), RecordStoreError> {
        (**self).add_log(job_id, source_tag, timestamp, message)
    }

    fn get_logs(
        &self,
        job_id: &JobId,
        from_timestamp: i64,
        limit: usize,
    ) -> Result<Vec<LogEntry>, RecordStoreError> {
        (**self).get_logs(job_id, from_timestamp, limit)
    }

    fn get_state_of_jobs(
        &self,
        start: Option<&JobId>,
        limit: usize,
    ) -> Result<Vec<StateRecord>, RecordStoreError> {
        (**self).get_state_of_jobs(start, limit)
    }

    fn set_meta_info(
        &self,
        job_id: &JobId,
        metadata: &ScriptMetadata,
    ) -> Result<(), RecordStoreError> {
        (**self).set_meta_info(job_id, metadata)
    }

    fn get_meta_info(&self, job_id: &JobId) -> Result<ScriptMetadata, RecordStoreError> {
        (**self).get_meta_info(job_id)
    }
}
