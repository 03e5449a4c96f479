//! Records kept per job: log lines, state observations and script metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{DomainError, DomainResult};
use crate::id::JobId;
use crate::state::JobState;

/// One line of a job's log stream.
///
/// `timestamp` is also the entry's storage key, so two lines written for the
/// same job at the same timestamp collapse into the later one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Sub-process or stage that emitted the line.
    pub source_tag: String,
    pub message: String,
    pub timestamp: i64,
}

impl LogEntry {
    pub fn new(source_tag: impl Into<String>, message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            source_tag: source_tag.into(),
            message: message.into(),
            timestamp,
        }
    }

    /// Interpret `timestamp` as epoch milliseconds.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

/// A state observation attached to a job, as produced by history listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub job_id: JobId,
    pub state: JobState,
}

impl StateRecord {
    pub fn new(job_id: JobId, state: JobState) -> Self {
        Self { job_id, state }
    }
}

/// Structured facts about a job's script and its results.
///
/// Unknown keys survive a decode/encode cycle through `extra`. An `extra` key
/// equal to one of [`ScriptMetadata::RESERVED_KEYS`] would serialize as a
/// duplicate field, so such keys are refused.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptMetadata {
    #[serde(default)]
    pub nr_of_results: i64,
    #[serde(default)]
    pub max_nr_of_results: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_descriptor: Option<String>,
    #[serde(default)]
    pub is_limited: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl ScriptMetadata {
    /// Serialized names of the typed fields.
    pub const RESERVED_KEYS: [&'static str; 4] =
        ["nrOfResults", "maxNrOfResults", "resultsDescriptor", "isLimited"];

    pub fn new(nr_of_results: i64, max_nr_of_results: i64, is_limited: bool) -> Self {
        Self {
            nr_of_results,
            max_nr_of_results,
            is_limited,
            ..Default::default()
        }
    }

    pub fn with_results_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.results_descriptor = Some(descriptor.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: JsonValue) -> DomainResult<Self> {
        let key = key.into();
        if Self::RESERVED_KEYS.contains(&key.as_str()) {
            return Err(DomainError::validation(format!(
                "metadata extra key `{key}` collides with a typed field"
            )));
        }
        self.extra.insert(key, value);
        Ok(self)
    }

    /// First `extra` key that shadows a typed field, if any.
    pub fn reserved_extra_key(&self) -> Option<&str> {
        Self::RESERVED_KEYS
            .into_iter()
            .find(|key| self.extra.contains_key(*key))
    }
}
