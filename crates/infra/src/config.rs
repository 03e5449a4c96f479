//! Store configuration.
//!
//! Built once (from code or the environment) and handed to the store by
//! value; nothing reads it through a global.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::paths::RecordKind;

pub const ENV_BASE_DIR: &str = "JOBREC_BASE_DIR";
pub const ENV_STATE_DIR: &str = "JOBREC_STATE_DIR";
pub const ENV_DETAILS_DIR: &str = "JOBREC_DETAILS_DIR";
pub const ENV_LOGS_DIR: &str = "JOBREC_LOGS_DIR";
pub const ENV_METAINFO_DIR: &str = "JOBREC_METAINFO_DIR";
pub const ENV_FORCED: &str = "JOBREC_FORCED";

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("{first} and {second} roots overlap at {}", path.display())]
    OverlappingRoots {
        first: RecordKind,
        second: RecordKind,
        path: PathBuf,
    },
}

/// Where each record kind lives, plus the bootstrap policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub state_root: PathBuf,
    pub details_root: PathBuf,
    pub logs_root: PathBuf,
    pub metainfo_root: PathBuf,
    /// Tolerate a root that exists but is not a directory.
    #[serde(default)]
    pub forced: bool,
}

impl StoreConfig {
    /// Conventional layout: `base/{state,details,logs,metainfo}`.
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            state_root: base.join("state"),
            details_root: base.join("details"),
            logs_root: base.join("logs"),
            metainfo_root: base.join("metainfo"),
            forced: false,
        }
    }

    pub fn forced(mut self, forced: bool) -> Self {
        self.forced = forced;
        self
    }

    /// Load from `JOBREC_*` environment variables.
    ///
    /// Each root may be set on its own; unset roots fall back to the
    /// conventional layout under `JOBREC_BASE_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StoreConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let base = non_empty(ENV_BASE_DIR).map(PathBuf::from);

        let root = |key: &'static str, dir: &str| -> Result<PathBuf, ConfigError> {
            match (non_empty(key), &base) {
                (Some(value), _) => Ok(PathBuf::from(value)),
                (None, Some(base)) => Ok(base.join(dir)),
                (None, None) => Err(ConfigError::Missing(key)),
            }
        };

        let forced = match non_empty(ENV_FORCED) {
            None => false,
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                key: ENV_FORCED,
                value,
            })?,
        };

        Ok(Self {
            state_root: root(ENV_STATE_DIR, "state")?,
            details_root: root(ENV_DETAILS_DIR, "details")?,
            logs_root: root(ENV_LOGS_DIR, "logs")?,
            metainfo_root: root(ENV_METAINFO_DIR, "metainfo")?,
            forced,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
