//! Round-Trip Engine
//!
//! One probe is one object's full lifecycle against the store:
//!
//! ```text
//! bucket_exists ──▶ (create_bucket) ──▶ upload_object ──▶ download_object
//! └──────────── send_file ───────────────────────┘  └──── get_file ────┘
//! ```
//!
//! Each phase is timed on a monotonic clock and the round-trip total is the
//! sum of the two phase measurements. Nothing is retried.

pub mod observer;
pub mod report;

pub use observer::{ProbeObserver, TracingObserver};
pub use report::ProbeReport;

use chrono::Utc;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::time::Instant;

use crate::config::StorageConfig;
use crate::credentials::Credentials;
use crate::storage::{ObjectStore, S3Store};
use crate::types::{BackendError, ConfigurationError, Phase, TransferError};

/// Appended to the source filename to get the download target.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Sibling path the round trip downloads into: `filename` + [`BACKUP_SUFFIX`].
pub fn backup_path(filename: impl AsRef<Path>) -> PathBuf {
    let mut raw: OsString = filename.as_ref().as_os_str().to_owned();
    raw.push(BACKUP_SUFFIX);
    PathBuf::from(raw)
}

/// Measures object-store round trips.
///
/// Not meant to be shared across concurrent probes; use one engine per probe.
pub struct Canary<S> {
    store: S,
    observer: Box<dyn ProbeObserver>,
}

impl Canary<S3Store> {
    /// Build an engine over the S3-compatible backend described by `config`.
    pub fn connect(
        credentials: &Credentials,
        config: &StorageConfig,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self::new(S3Store::new(credentials, config)?))
    }
}

impl<S: ObjectStore> Canary<S> {
    pub fn new(store: S) -> Self {
        Self::with_observer(store, TracingObserver)
    }

    pub fn with_observer(store: S, observer: impl ProbeObserver + 'static) -> Self {
        Self {
            store,
            observer: Box::new(observer),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ensure `bucket` exists, then upload `source` under `key`.
    ///
    /// Returns the seconds spent on both steps together.
    pub async fn send_file(
        &self,
        source: impl AsRef<Path>,
        bucket: &str,
        key: &str,
    ) -> Result<f64, TransferError> {
        self.timed_upload(source.as_ref(), bucket, key)
            .await
            .map(|(seconds, _)| seconds)
    }

    /// Download `bucket/key` into `dest`, returning the seconds it took.
    pub async fn get_file(
        &self,
        dest: impl AsRef<Path>,
        bucket: &str,
        key: &str,
    ) -> Result<f64, TransferError> {
        let dest = dest.as_ref();
        self.observer.phase_started(Phase::Download, bucket, key, dest);

        let start = Instant::now();
        let result = self.store.download_object(bucket, key, dest).await;
        let seconds = start.elapsed().as_secs_f64();

        self.finish(Phase::Download, seconds, result)
    }

    /// Upload `filename`, download it back to [`backup_path`], and report both.
    pub async fn probe(
        &self,
        filename: impl AsRef<Path>,
        bucket: &str,
        key: &str,
    ) -> Result<ProbeReport, TransferError> {
        let source = filename.as_ref();
        let download_path = backup_path(source);
        let started_at = Utc::now();

        let (upload_seconds, bucket_created) = self.timed_upload(source, bucket, key).await?;
        let download_seconds = self.get_file(&download_path, bucket, key).await?;

        let report = ProbeReport {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source: source.to_path_buf(),
            download_path,
            upload_seconds,
            download_seconds,
            total_seconds: upload_seconds + download_seconds,
            bucket_created,
            started_at,
        };
        self.observer.probe_finished(&report);
        Ok(report)
    }

    /// Total seconds for one upload-then-download probe.
    pub async fn round_trip(
        &self,
        filename: impl AsRef<Path>,
        bucket: &str,
        key: &str,
    ) -> Result<f64, TransferError> {
        self.probe(filename, bucket, key)
            .await
            .map(|report| report.total_seconds)
    }

    async fn timed_upload(
        &self,
        source: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<(f64, bool), TransferError> {
        self.observer.phase_started(Phase::Upload, bucket, key, source);

        let start = Instant::now();
        let result = self.reconcile_and_upload(source, bucket, key).await;
        let seconds = start.elapsed().as_secs_f64();

        let created = match &result {
            Ok(created) => *created,
            Err(_) => false,
        };
        self.finish(Phase::Upload, seconds, result)
            .map(|seconds| (seconds, created))
    }

    async fn reconcile_and_upload(
        &self,
        source: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<bool, BackendError> {
        let exists = match self.store.bucket_exists(bucket).await {
            Ok(exists) => exists,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e),
        };

        if !exists {
            self.store.create_bucket(bucket).await?;
            self.observer.bucket_created(bucket);
        }

        self.store.upload_object(bucket, key, source).await?;
        Ok(!exists)
    }

    fn finish<T>(
        &self,
        phase: Phase,
        seconds: f64,
        result: Result<T, BackendError>,
    ) -> Result<f64, TransferError> {
        match result {
            Ok(_) => {
                self.observer.phase_finished(phase, seconds);
                Ok(seconds)
            }
            Err(source) => {
                let err = TransferError::new(phase, source);
                self.observer.phase_failed(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MockStore, StoreCall};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    const TEST_BUCKET: &str = "objectcanary";
    const TEST_KEY: &str = "testFile_canary";

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
        finished: Mutex<Vec<(Phase, f64)>>,
    }

    impl ProbeObserver for RecordingObserver {
        fn phase_started(&self, phase: Phase, _bucket: &str, _key: &str, _path: &Path) {
            self.events.lock().unwrap().push(format!("start {}", phase));
        }

        fn bucket_created(&self, bucket: &str) {
            self.events.lock().unwrap().push(format!("created {}", bucket));
        }

        fn phase_finished(&self, phase: Phase, seconds: f64) {
            self.events.lock().unwrap().push(format!("finish {}", phase));
            self.finished.lock().unwrap().push((phase, seconds));
        }

        fn phase_failed(&self, error: &TransferError) {
            self.events.lock().unwrap().push(format!("fail {}", error.phase));
        }

        fn probe_finished(&self, _report: &ProbeReport) {
            self.events.lock().unwrap().push("done".to_string());
        }
    }

    fn creates(calls: &[StoreCall]) -> usize {
        calls.iter().filter(|c| matches!(c, StoreCall::CreateBucket(_))).count()
    }

    fn uploads(calls: &[StoreCall]) -> usize {
        calls.iter().filter(|c| matches!(c, StoreCall::Upload { .. })).count()
    }

    fn downloads(calls: &[StoreCall]) -> usize {
        calls.iter().filter(|c| matches!(c, StoreCall::Download { .. })).count()
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(backup_path("f"), PathBuf::from("f.bak"));
        assert_eq!(backup_path("dir/f.txt"), PathBuf::from("dir/f.txt.bak"));
    }

    #[tokio::test]
    async fn test_send_file_creates_missing_bucket() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("transfer_file");
        let canary = Canary::new(MockStore::new());

        canary.send_file(&source, TEST_BUCKET, TEST_KEY).await.unwrap();

        let calls = canary.store().calls();
        assert_eq!(
            calls,
            vec![
                StoreCall::BucketExists(TEST_BUCKET.to_string()),
                StoreCall::CreateBucket(TEST_BUCKET.to_string()),
                StoreCall::Upload {
                    bucket: TEST_BUCKET.to_string(),
                    key: TEST_KEY.to_string(),
                    path: source.clone(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_send_file_skips_create_for_existing_bucket() {
        let dir = TempDir::new().unwrap();
        let canary = Canary::new(MockStore::new().with_bucket(TEST_BUCKET));

        canary
            .send_file(dir.path().join("transfer_file"), TEST_BUCKET, TEST_KEY)
            .await
            .unwrap();

        let calls = canary.store().calls();
        assert_eq!(creates(&calls), 0);
        assert_eq!(uploads(&calls), 1);
    }

    #[tokio::test]
    async fn test_not_found_error_from_existence_check_creates_bucket() {
        let dir = TempDir::new().unwrap();
        let store =
            MockStore::new().fail_bucket_exists(BackendError::NotFound(TEST_BUCKET.to_string()));
        let canary = Canary::new(store);

        canary
            .send_file(dir.path().join("transfer_file"), TEST_BUCKET, TEST_KEY)
            .await
            .unwrap();

        let calls = canary.store().calls();
        assert_eq!(creates(&calls), 1);
        assert_eq!(uploads(&calls), 1);
    }

    #[tokio::test]
    async fn test_other_existence_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::new().fail_bucket_exists(BackendError::Status {
            code: 403,
            message: "AccessDenied".to_string(),
        });
        let canary = Canary::new(store);

        let err = canary
            .send_file(dir.path().join("transfer_file"), TEST_BUCKET, TEST_KEY)
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::Upload);
        assert!(matches!(err.source, BackendError::Status { code: 403, .. }));
        assert_eq!(
            canary.store().calls(),
            vec![StoreCall::BucketExists(TEST_BUCKET.to_string())]
        );
    }

    #[tokio::test]
    async fn test_create_failure_skips_upload() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::new().fail_create_bucket(BackendError::Client("throttled".into()));
        let canary = Canary::new(store);

        let err = canary
            .send_file(dir.path().join("transfer_file"), TEST_BUCKET, TEST_KEY)
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::Upload);
        assert_eq!(uploads(&canary.store().calls()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_a_file() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::new().with_upload_latency(Duration::from_secs(1));
        let canary = Canary::new(store);

        let time_taken = canary
            .send_file(dir.path().join("transfer_file"), TEST_BUCKET, TEST_KEY)
            .await
            .unwrap();
        assert!(approx_eq(time_taken, 1.0), "got {}", time_taken);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_a_file() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::new().with_download_latency(Duration::from_secs(2));
        let canary = Canary::new(store);
        canary
            .send_file(dir.path().join("transfer_file"), TEST_BUCKET, TEST_KEY)
            .await
            .unwrap();

        let time_taken = canary
            .get_file(dir.path().join("transfer_file.bk"), TEST_BUCKET, TEST_KEY)
            .await
            .unwrap();
        assert!(approx_eq(time_taken, 2.0), "got {}", time_taken);
    }

    #[tokio::test]
    async fn test_zero_latency_durations_are_non_negative() {
        let dir = TempDir::new().unwrap();
        let canary = Canary::new(MockStore::new());
        let source = dir.path().join("transfer_file");

        let up = canary.send_file(&source, TEST_BUCKET, TEST_KEY).await.unwrap();
        let down = canary
            .get_file(backup_path(&source), TEST_BUCKET, TEST_KEY)
            .await
            .unwrap();
        assert!(up >= 0.0);
        assert!(down >= 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_round_trip() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("f");
        let store = MockStore::new()
            .with_upload_latency(Duration::from_secs(1))
            .with_download_latency(Duration::from_secs(2));
        let observer = Arc::new(RecordingObserver::default());
        let canary = Canary::with_observer(store, observer.clone());

        let total = canary.round_trip(&source, "b", "k").await.unwrap();

        let finished = observer.finished.lock().unwrap().clone();
        assert_eq!(finished.len(), 2);
        assert_eq!(finished[0].0, Phase::Upload);
        assert_eq!(finished[1].0, Phase::Download);
        assert!(approx_eq(total, finished[0].1 + finished[1].1));
        assert!(approx_eq(total, 3.0), "got {}", total);

        let calls = canary.store().calls();
        assert_eq!(
            calls.last(),
            Some(&StoreCall::Download {
                bucket: "b".to_string(),
                key: "k".to_string(),
                path: dir.path().join("f.bak"),
            })
        );
    }

    #[tokio::test]
    async fn test_round_trip_copies_content_to_backup() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("transfer_file");
        std::fs::write(&source, b"canary payload").unwrap();
        let canary = Canary::new(MockStore::new());

        let report = canary.probe(&source, TEST_BUCKET, TEST_KEY).await.unwrap();

        assert!(report.bucket_created);
        assert_eq!(report.download_path, dir.path().join("transfer_file.bak"));
        assert!(approx_eq(
            report.total_seconds,
            report.upload_seconds + report.download_seconds
        ));
        assert_eq!(std::fs::read(&source).unwrap(), b"canary payload");
        assert_eq!(std::fs::read(&report.download_path).unwrap(), b"canary payload");
    }

    #[tokio::test]
    async fn test_upload_failure_never_downloads() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::new().fail_upload(BackendError::Client("connection reset".into()));
        let canary = Canary::new(store);

        let err = canary
            .round_trip(dir.path().join("f"), "b", "k")
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::Upload);
        assert_eq!(downloads(&canary.store().calls()), 0);
    }

    #[tokio::test]
    async fn test_download_failure_after_upload() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::new().fail_download(BackendError::Status {
            code: 403,
            message: "AccessDenied".to_string(),
        });
        let observer = Arc::new(RecordingObserver::default());
        let canary = Canary::with_observer(store, observer.clone());

        let err = canary
            .round_trip(dir.path().join("f"), "b", "k")
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::Download);
        let calls = canary.store().calls();
        assert_eq!(uploads(&calls), 1);
        assert_eq!(downloads(&calls), 1);
        assert!(!observer.events.lock().unwrap().contains(&"done".to_string()));
    }

    #[tokio::test]
    async fn test_observer_sees_events_in_order() {
        let dir = TempDir::new().unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let canary = Canary::with_observer(MockStore::new(), observer.clone());

        canary.round_trip(dir.path().join("f"), "b", "k").await.unwrap();

        assert_eq!(
            *observer.events.lock().unwrap(),
            vec![
                "start upload",
                "created b",
                "finish upload",
                "start download",
                "finish download",
                "done",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_object_is_download_error() {
        let dir = TempDir::new().unwrap();
        let canary = Canary::new(MockStore::new().with_bucket("b"));

        let err = canary
            .get_file(dir.path().join("out"), "b", "absent")
            .await
            .unwrap_err();
        assert_eq!(err.phase, Phase::Download);
        assert!(err.source.is_not_found());
    }

    #[tokio::test]
    async fn test_missing_source_is_upload_error() {
        let dir = TempDir::new().unwrap();
        let canary = Canary::new(MockStore::new().require_source_files());

        let err = canary
            .round_trip(dir.path().join("absent"), "b", "k")
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::Upload);
        assert!(matches!(err.source, BackendError::Io { .. }));
        assert_eq!(downloads(&canary.store().calls()), 0);
    }

    #[tokio::test]
    async fn test_unwritable_destination_is_download_error() {
        let dir = TempDir::new().unwrap();
        let canary = Canary::new(MockStore::new());
        canary
            .send_file(dir.path().join("f"), "b", "k")
            .await
            .unwrap();

        let err = canary
            .get_file(dir.path().join("nodir").join("out"), "b", "k")
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::Download);
        assert!(matches!(err.source, BackendError::Io { .. }));
    }

    #[tokio::test]
    async fn test_round_trip_overwrites_existing_backup() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("f");
        std::fs::write(&source, b"new").unwrap();
        std::fs::write(dir.path().join("f.bak"), b"stale content from an earlier run").unwrap();
        let canary = Canary::new(MockStore::new());

        canary.round_trip(&source, "b", "k").await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("f.bak")).unwrap(), b"new");
    }
}
