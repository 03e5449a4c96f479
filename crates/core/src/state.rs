//! Job lifecycle stages.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Lifecycle stage of a job.
///
/// Stored as its textual name. Transitions are not enforced here; whoever
/// drives the job decides what comes next.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Submitted, waiting for an executor
    InQueue,
    /// Currently executing
    Running,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
    /// Stopped by user/system
    Cancelled,
}

impl JobState {
    pub const ALL: [JobState; 5] = [
        JobState::InQueue,
        JobState::Running,
        JobState::Done,
        JobState::Failed,
        JobState::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::InQueue => "IN_QUEUE",
            JobState::Running => "RUNNING",
            JobState::Done => "DONE",
            JobState::Failed => "FAILED",
            JobState::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Cancelled)
    }
}

impl core::fmt::Display for JobState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = DomainError;

    /// Exact, case-sensitive match. A trailing newline from a hand-edited
    /// file is tolerated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim_matches(|c: char| c.is_ascii_whitespace());
        JobState::ALL
            .into_iter()
            .find(|state| state.as_str() == name)
            .ok_or_else(|| DomainError::validation(format!("unknown job state: {name:?}")))
    }
}
