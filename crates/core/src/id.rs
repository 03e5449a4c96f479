//! Job identifiers.
//!
//! A `JobId` doubles as a file name inside the record roots, so it must be a
//! single, non-empty, non-hidden path segment. Ordering is plain
//! lexicographic string ordering; history listings rely on it.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of one submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Validate and wrap an identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        validate_segment(&value)?;
        Ok(Self(value))
    }

    /// Mint a fresh identifier.
    ///
    /// Uses UUIDv7 text, so lexicographic order follows creation time. Prefer
    /// passing IDs explicitly in tests for determinism.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_segment(value: &str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::invalid_id("JobId: cannot be empty"));
    }
    if value.starts_with('.') {
        return Err(DomainError::invalid_id(format!(
            "JobId: cannot start with '.': {value}"
        )));
    }
    if let Some(c) = value.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(DomainError::invalid_id(format!(
            "JobId: contains forbidden character {c:?}: {value}"
        )));
    }
    Ok(())
}

impl core::fmt::Display for JobId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for JobId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for JobId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JobId> for String {
    fn from(value: JobId) -> Self {
        value.0
    }
}
