//! Mapping from (record kind, job id, sub-key) to blob-store paths.
//!
//! ```text
//! <state_root>/<job_id>                  current state name
//! <details_root>/<job_id>                script text
//! <metainfo_root>/<job_id>               encoded metadata
//! <logs_root>/<job_id>/<timestamp>       one log line per timestamp
//! ```

use std::path::{Component, Path, PathBuf};

use jobrec_core::JobId;

use crate::config::{ConfigError, StoreConfig};

/// Kind of record kept per job.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecordKind {
    State,
    Details,
    Log,
    MetaInfo,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Log,
        RecordKind::State,
        RecordKind::Details,
        RecordKind::MetaInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::State => "state",
            RecordKind::Details => "details",
            RecordKind::Log => "log",
            RecordKind::MetaInfo => "metainfo",
        }
    }
}

impl core::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure path layout. No I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathScheme {
    state_root: PathBuf,
    details_root: PathBuf,
    logs_root: PathBuf,
    metainfo_root: PathBuf,
}

impl PathScheme {
    /// Build the layout, refusing roots that would alias each other.
    pub fn new(config: &StoreConfig) -> Result<Self, ConfigError> {
        let scheme = Self {
            state_root: config.state_root.clone(),
            details_root: config.details_root.clone(),
            logs_root: config.logs_root.clone(),
            metainfo_root: config.metainfo_root.clone(),
        };

        for (i, a) in RecordKind::ALL.iter().enumerate() {
            for b in &RecordKind::ALL[i + 1..] {
                let (pa, pb) = (lexical(scheme.root(*a)), lexical(scheme.root(*b)));
                if pa.starts_with(&pb) || pb.starts_with(&pa) {
                    return Err(ConfigError::OverlappingRoots {
                        first: *a,
                        second: *b,
                        path: pa.min(pb),
                    });
                }
            }
        }

        Ok(scheme)
    }

    pub fn root(&self, kind: RecordKind) -> &Path {
        match kind {
            RecordKind::State => &self.state_root,
            RecordKind::Details => &self.details_root,
            RecordKind::Log => &self.logs_root,
            RecordKind::MetaInfo => &self.metainfo_root,
        }
    }

    /// Path of a single-file record. For `RecordKind::Log` this is the job's
    /// log directory.
    pub fn path_for(&self, kind: RecordKind, job_id: &JobId) -> PathBuf {
        self.root(kind).join(job_id.as_str())
    }

    pub fn log_dir(&self, job_id: &JobId) -> PathBuf {
        self.path_for(RecordKind::Log, job_id)
    }

    pub fn log_entry(&self, job_id: &JobId, timestamp: i64) -> PathBuf {
        self.log_dir(job_id).join(log_key(timestamp))
    }
}

/// `path` without `.` components. `..` and symlinks are left alone.
fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Storage sub-key of a log line: the timestamp in decimal.
pub fn log_key(timestamp: i64) -> String {
    timestamp.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> JobId {
        JobId::new(s).unwrap()
    }

    #[test]
    fn layout() {
        let scheme = PathScheme::new(&StoreConfig::under("/srv/jobs")).unwrap();
        let job = id("job-7");

        assert_eq!(
            scheme.path_for(RecordKind::State, &job),
            PathBuf::from("/srv/jobs/state/job-7")
        );
        assert_eq!(
            scheme.path_for(RecordKind::Details, &job),
            PathBuf::from("/srv/jobs/details/job-7")
        );
        assert_eq!(
            scheme.path_for(RecordKind::MetaInfo, &job),
            PathBuf::from("/srv/jobs/metainfo/job-7")
        );
        assert_eq!(
            scheme.log_entry(&job, 1_400_000_000_123),
            PathBuf::from("/srv/jobs/logs/job-7/1400000000123")
        );
    }

    #[test]
    fn negative_timestamps_keep_their_sign() {
        let scheme = PathScheme::new(&StoreConfig::under("/srv/jobs")).unwrap();
        assert_eq!(
            scheme.log_entry(&id("j"), -5),
            PathBuf::from("/srv/jobs/logs/j/-5")
        );
    }

    #[test]
    fn identical_roots_are_rejected() {
        let mut config = StoreConfig::under("/srv/jobs");
        config.details_root = config.state_root.clone();

        assert!(matches!(
            PathScheme::new(&config),
            Err(ConfigError::OverlappingRoots { .. })
        ));
    }

    #[test]
    fn nested_roots_are_rejected() {
        let mut config = StoreConfig::under("/srv/jobs");
        config.metainfo_root = config.logs_root.join("meta");

        let err = PathScheme::new(&config).unwrap_err();
        match err {
            ConfigError::OverlappingRoots { first, second, .. } => {
                assert_eq!((first, second), (RecordKind::Log, RecordKind::MetaInfo));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn dot_spelled_aliases_are_rejected() {
        let mut config = StoreConfig::under("/srv/jobs");
        config.details_root = PathBuf::from("/srv/jobs/./state");
        assert!(matches!(
            PathScheme::new(&config),
            Err(ConfigError::OverlappingRoots { .. })
        ));

        let mut config = StoreConfig::under("jobs");
        config.state_root = PathBuf::from("./jobs/state");
        config.metainfo_root = PathBuf::from("jobs/state");
        match PathScheme::new(&config).unwrap_err() {
            ConfigError::OverlappingRoots { first, second, path } => {
                assert_eq!((first, second), (RecordKind::State, RecordKind::MetaInfo));
                assert_eq!(path, PathBuf::from("jobs/state"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lexical_drops_only_current_dir_components() {
        assert_eq!(lexical(Path::new("./a/./b")), PathBuf::from("a/b"));
        assert_eq!(lexical(Path::new("/a/../b")), PathBuf::from("/a/../b"));
    }
}
