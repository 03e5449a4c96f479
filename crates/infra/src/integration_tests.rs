//! Integration tests for the full record pipeline.
//!
//! Tests: JobRecordStore → PathScheme → pagination → BlobStore
//!
//! Every scenario runs against both the in-memory store and the filesystem
//! store (on a temp directory), so the two backends stay interchangeable.

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use jobrec_core::{JobId, JobState, LogEntry, ScriptMetadata};
    use tempfile::TempDir;

    use crate::blob::{BlobStore, BlobStoreError, FsBlobStore, InMemoryBlobStore};
    use crate::config::StoreConfig;
    use crate::paths::RecordKind;
    use crate::records::{JobLogging, JobRecordStore, RecordStoreError};

    fn id(s: &str) -> JobId {
        JobId::new(s).unwrap()
    }

    fn in_memory() -> (Arc<dyn JobLogging>, Arc<InMemoryBlobStore>) {
        jobrec_observability::init_with_default("debug");
        let blob = Arc::new(InMemoryBlobStore::new());
        let store = JobRecordStore::open(StoreConfig::under("/jobrec"), blob.clone()).unwrap();
        (Arc::new(store), blob)
    }

    fn on_disk() -> (Arc<dyn JobLogging>, TempDir) {
        jobrec_observability::init_with_default("debug");
        let tmp = tempfile::tempdir().unwrap();
        let store = JobRecordStore::open(StoreConfig::under(tmp.path()), FsBlobStore::new()).unwrap();
        (Arc::new(store), tmp)
    }

    /// Run `scenario` once per backend.
    fn both(scenario: impl Fn(&dyn JobLogging)) {
        let (store, _blob) = in_memory();
        scenario(store.as_ref());

        let (store, _tmp) = on_disk();
        scenario(store.as_ref());
    }

    #[test]
    fn state_round_trips_for_every_value() {
        both(|store| {
            let job = id("job-1");
            for state in JobState::ALL {
                store.set_state(&job, state).unwrap();
                assert_eq!(store.get_state(&job).unwrap(), state);
            }
        });
    }

    #[test]
    fn latest_state_wins() {
        both(|store| {
            let job = id("job-1");
            store.set_state(&job, JobState::Running).unwrap();
            store.set_state(&job, JobState::Failed).unwrap();
            assert_eq!(store.get_state(&job).unwrap(), JobState::Failed);
        });
    }

    #[test]
    fn missing_records_are_not_found() {
        both(|store| {
            let job = id("never-written");
            assert!(matches!(
                store.get_state(&job),
                Err(RecordStoreError::NotFound { .. })
            ));
            assert!(matches!(
                store.get_script_details(&job),
                Err(RecordStoreError::NotFound { .. })
            ));
            assert!(matches!(
                store.get_meta_info(&job),
                Err(RecordStoreError::NotFound { .. })
            ));
        });
    }

    #[test]
    fn script_details_are_stored_verbatim() {
        both(|store| {
            let job = id("job-2");
            for text in ["", "select * from t;\n-- trailing comment\n", "ünïcødé ✓"] {
                store.set_script_details(&job, text).unwrap();
                assert_eq!(store.get_script_details(&job).unwrap(), text);
            }
        });
    }

    #[test]
    fn metadata_round_trips() {
        both(|store| {
            let job = id("job-3");
            let values = [
                ScriptMetadata::default(),
                ScriptMetadata::new(12, 100, true).with_results_descriptor("parquet"),
                ScriptMetadata::new(-1, 0, false)
                    .with_extra("tags", serde_json::json!(["a", "b"]))
                    .and_then(|m| m.with_extra("retries", serde_json::json!(3)))
                    .unwrap(),
            ];
            for meta in values {
                store.set_meta_info(&job, &meta).unwrap();
                assert_eq!(store.get_meta_info(&job).unwrap(), meta);
            }
        });
    }

    #[test]
    fn metadata_with_shadowing_extra_key_is_refused() {
        both(|store| {
            let job = id("job-3b");
            let mut meta = ScriptMetadata::new(5, 10, true);
            meta.extra.insert("nrOfResults".into(), serde_json::json!(7));

            assert!(matches!(
                store.set_meta_info(&job, &meta),
                Err(RecordStoreError::Encoding(_))
            ));
            assert!(matches!(
                store.get_meta_info(&job),
                Err(RecordStoreError::NotFound { .. })
            ));
        });
    }

    #[test]
    fn logs_replay_in_timestamp_order() {
        both(|store| {
            let job = id("job-4");
            store.add_log(&job, "driver", 1_000, "first").unwrap();
            store.add_log(&job, "driver", 2_000, "second").unwrap();

            assert_eq!(
                store.get_logs(&job, 1_000, 2).unwrap(),
                vec![
                    LogEntry::new("driver", "first", 1_000),
                    LogEntry::new("driver", "second", 2_000),
                ]
            );
        });
    }

    #[test]
    fn logs_page_from_cursor_and_respect_limit() {
        both(|store| {
            let job = id("job-5");
            for (t, msg) in [(1_100, "a"), (1_200, "b"), (1_300, "c"), (1_400, "d")] {
                store.add_log(&job, "stage", t, msg).unwrap();
            }

            let page = store.get_logs(&job, 1_200, 1).unwrap();
            assert_eq!(page, vec![LogEntry::new("stage", "b", 1_200)]);

            let page = store.get_logs(&job, 1_300, 10).unwrap();
            let messages: Vec<_> = page.iter().map(|e| e.message.as_str()).collect();
            assert_eq!(messages, vec!["c", "d"]);

            assert!(store.get_logs(&job, 1_100, 0).unwrap().is_empty());
        });
    }

    #[test]
    fn unknown_log_cursor_returns_from_the_start() {
        both(|store| {
            let job = id("job-6");
            for t in [10, 20, 30] {
                store.add_log(&job, "s", t, &format!("m{t}")).unwrap();
            }

            let page = store.get_logs(&job, 25, 2).unwrap();
            let stamps: Vec<_> = page.iter().map(|e| e.timestamp).collect();
            assert_eq!(stamps, vec![10, 20]);
        });
    }

    #[test]
    fn same_timestamp_overwrites_log_line() {
        both(|store| {
            let job = id("job-7");
            store.add_log(&job, "a", 500, "original").unwrap();
            store.add_log(&job, "b", 500, "replacement").unwrap();

            assert_eq!(
                store.get_logs(&job, 500, 10).unwrap(),
                vec![LogEntry::new("b", "replacement", 500)]
            );
        });
    }

    #[test]
    fn logs_of_unknown_job_are_empty() {
        both(|store| {
            assert!(store.get_logs(&id("ghost"), 0, 10).unwrap().is_empty());
        });
    }

    #[test]
    fn malformed_log_lines_are_skipped() {
        both(|store| {
            let job = id("job-8");
            store.add_log(&job, "ok", 100, "kept").unwrap();
            store.add_log(&job, "bad-----tag", 200, "dropped").unwrap();
            store.add_log(&job, "ok", 300, "also kept").unwrap();

            let page = store.get_logs(&job, 100, 10).unwrap();
            let stamps: Vec<_> = page.iter().map(|e| e.timestamp).collect();
            assert_eq!(stamps, vec![100, 300]);
        });
    }

    #[test]
    fn history_lists_newest_id_first() {
        both(|store| {
            for (name, state) in [
                ("a", JobState::Done),
                ("b", JobState::Failed),
                ("c", JobState::Running),
            ] {
                store.set_state(&id(name), state).unwrap();
            }

            let all = store.get_state_of_jobs(None, 10).unwrap();
            let order: Vec<_> = all.iter().map(|r| r.job_id.as_str()).collect();
            assert_eq!(order, vec!["c", "b", "a"]);
            assert_eq!(all[0].state, JobState::Running);
            assert_eq!(all[2].state, JobState::Done);

            let from_b = store.get_state_of_jobs(Some(&id("b")), 1).unwrap();
            assert_eq!(from_b.len(), 1);
            assert_eq!(from_b[0].job_id, id("b"));
            assert_eq!(from_b[0].state, JobState::Failed);

            // Unknown cursor: whole set, newest first.
            let from_missing = store.get_state_of_jobs(Some(&id("bb")), 2).unwrap();
            let order: Vec<_> = from_missing.iter().map(|r| r.job_id.as_str()).collect();
            assert_eq!(order, vec!["c", "b"]);

            assert!(store.get_state_of_jobs(None, 0).unwrap().is_empty());
        });
    }

    #[test]
    fn history_is_independent_of_other_record_kinds() {
        both(|store| {
            store.set_script_details(&id("only-details"), "x").unwrap();
            store.add_log(&id("only-logs"), "t", 1, "m").unwrap();
            store.set_state(&id("with-state"), JobState::InQueue).unwrap();

            let all = store.get_state_of_jobs(None, 10).unwrap();
            assert_eq!(all.len(), 1);
            assert_eq!(all[0].job_id, id("with-state"));
        });
    }

    #[test]
    fn corrupted_state_is_invalid_encoding() {
        let (store, blob) = in_memory();
        blob.write(Path::new("/jobrec/state/job-9"), b"EXPLODED").unwrap();

        assert!(matches!(
            store.get_state(&id("job-9")),
            Err(RecordStoreError::InvalidEncoding { .. })
        ));
        assert!(matches!(
            store.get_state_of_jobs(None, 10),
            Err(RecordStoreError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn corrupted_metadata_is_a_decoding_failure() {
        let (store, tmp) = on_disk();
        std::fs::write(tmp.path().join("metainfo").join("job-10"), b"{oops").unwrap();

        assert!(matches!(
            store.get_meta_info(&id("job-10")),
            Err(RecordStoreError::Decoding(_))
        ));
    }

    #[test]
    fn non_timestamp_log_entries_are_skipped() {
        let (store, blob) = in_memory();
        let job = id("job-11");
        store.add_log(&job, "t", 7, "real").unwrap();
        blob.write(Path::new("/jobrec/logs/job-11/notes"), b"x-----y").unwrap();

        assert_eq!(
            store.get_logs(&job, 7, 10).unwrap(),
            vec![LogEntry::new("t", "real", 7)]
        );
    }

    #[test]
    fn write_failure_surfaces_as_storage_error() {
        let (store, blob) = in_memory();
        // A file where the job's log directory should be.
        blob.write(Path::new("/jobrec/logs/job-12"), b"in the way").unwrap();

        assert!(matches!(
            store.add_log(&id("job-12"), "t", 1, "m"),
            Err(RecordStoreError::Storage(BlobStoreError::WrongType(_)))
        ));
    }

    #[test]
    fn bootstrap_rejects_wrong_type_root_unless_forced() {
        let blob = Arc::new(InMemoryBlobStore::new());
        blob.insert_raw("/jobrec/details", "a file, not a directory")
            .unwrap();

        let err = JobRecordStore::open(StoreConfig::under("/jobrec"), blob.clone()).unwrap_err();
        assert!(matches!(
            err,
            RecordStoreError::Bootstrap {
                source: BlobStoreError::WrongType(_),
                ..
            }
        ));

        let store = JobRecordStore::open(StoreConfig::under("/jobrec").forced(true), blob.clone());
        assert!(store.is_ok());
    }

    #[test]
    fn bootstrap_storage_failure_is_fatal_even_when_forced() {
        // Every ensure_dir fails with an I/O error; calls are recorded.
        #[derive(Debug)]
        struct BrokenDirs {
            inner: InMemoryBlobStore,
            calls: Mutex<Vec<PathBuf>>,
        }

        impl BlobStore for BrokenDirs {
            fn ensure_dir(
                &self,
                path: &Path,
                _fail_if_wrong_type: bool,
            ) -> Result<crate::blob::DirOutcome, BlobStoreError> {
                self.calls.lock().unwrap().push(path.to_path_buf());
                Err(BlobStoreError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only mount"),
                ))
            }

            fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), BlobStoreError> {
                self.inner.write(path, bytes)
            }

            fn read(&self, path: &Path) -> Result<Vec<u8>, BlobStoreError> {
                self.inner.read(path)
            }

            fn list(
                &self,
                path: &Path,
            ) -> Result<std::collections::BTreeSet<String>, BlobStoreError> {
                self.inner.list(path)
            }
        }

        let blob = Arc::new(BrokenDirs {
            inner: InMemoryBlobStore::new(),
            calls: Mutex::new(Vec::new()),
        });

        let err = JobRecordStore::open(StoreConfig::under("/jobrec").forced(true), blob.clone())
            .unwrap_err();
        assert!(matches!(
            err,
            RecordStoreError::Bootstrap {
                kind: RecordKind::Log,
                source: BlobStoreError::Io { .. },
            }
        ));
        assert_eq!(
            *blob.calls.lock().unwrap(),
            vec![PathBuf::from("/jobrec/logs")]
        );
    }

    #[test]
    fn bootstrap_accepts_existing_roots_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let config = StoreConfig::under(tmp.path());

        let first = JobRecordStore::open(config.clone(), FsBlobStore::new()).unwrap();
        first.set_state(&id("kept"), JobState::Done).unwrap();

        let second = JobRecordStore::open(config, FsBlobStore::new()).unwrap();
        assert_eq!(second.get_state(&id("kept")).unwrap(), JobState::Done);
    }

    #[test]
    fn bootstrap_rejects_aliasing_roots() {
        let mut config = StoreConfig::under("/jobrec");
        config.logs_root = config.state_root.clone();

        let err = JobRecordStore::open(config, InMemoryBlobStore::new()).unwrap_err();
        assert!(matches!(err, RecordStoreError::Config(_)));
    }

    #[test]
    fn bootstrap_creates_all_roots() {
        let blob = Arc::new(InMemoryBlobStore::new());
        let store = JobRecordStore::open(StoreConfig::under("/jobrec"), blob.clone()).unwrap();

        for dir in ["state", "details", "logs", "metainfo"] {
            assert!(blob.list(&Path::new("/jobrec").join(dir)).unwrap().is_empty());
        }

        store.add_log(&id("job-13"), "t", 1, "m").unwrap();
        assert_eq!(
            blob.list(Path::new("/jobrec/logs")).unwrap().into_iter().collect::<Vec<_>>(),
            vec!["job-13".to_string()]
        );
    }

    #[test]
    fn entries_removed_between_list_and_read_are_skipped() {
        // Simulates an external cleaner racing a history read: the entry is
        // listed but gone by the time it is read.
        struct VanishingReads(InMemoryBlobStore);

        impl BlobStore for VanishingReads {
            fn ensure_dir(
                &self,
                path: &Path,
                fail_if_wrong_type: bool,
            ) -> Result<crate::blob::DirOutcome, BlobStoreError> {
                self.0.ensure_dir(path, fail_if_wrong_type)
            }

            fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), BlobStoreError> {
                self.0.write(path, bytes)
            }

            fn read(&self, path: &Path) -> Result<Vec<u8>, BlobStoreError> {
                if path.ends_with("b") {
                    self.0.remove_raw(path)?;
                }
                self.0.read(path)
            }

            fn list(
                &self,
                path: &Path,
            ) -> Result<std::collections::BTreeSet<String>, BlobStoreError> {
                self.0.list(path)
            }
        }

        let store = JobRecordStore::open(
            StoreConfig::under("/jobrec"),
            VanishingReads(InMemoryBlobStore::new()),
        )
        .unwrap();
        for name in ["a", "b", "c"] {
            store.set_state(&id(name), JobState::Done).unwrap();
        }

        let all = store.get_state_of_jobs(None, 10).unwrap();
        let order: Vec<_> = all.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(order, vec!["c", "a"]);
    }
}
