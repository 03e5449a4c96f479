//! `jobrec-core` — job record domain types.
//!
//! This crate contains **pure domain** primitives (no storage concerns).

pub mod error;
pub mod id;
pub mod record;
pub mod state;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use record::{LogEntry, ScriptMetadata, StateRecord};
pub use state::JobState;
