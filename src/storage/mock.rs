//! In-memory object store for network-free tests.
//!
//! Records every call in order, can be told to fail any single operation,
//! and can simulate transfer latency with `tokio::time::sleep` so tests
//! running on a paused clock get exact durations.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::fs;

use super::ObjectStore;
use crate::types::BackendError;

/// One recorded invocation against a [`MockStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    BucketExists(String),
    CreateBucket(String),
    Upload { bucket: String, key: String, path: PathBuf },
    Download { bucket: String, key: String, path: PathBuf },
}

#[derive(Default)]
struct State {
    buckets: HashSet<String>,
    objects: HashMap<(String, String), Vec<u8>>,
    calls: Vec<StoreCall>,
}

#[derive(Default)]
pub struct MockStore {
    state: Mutex<State>,
    upload_latency: Duration,
    download_latency: Duration,
    strict_sources: bool,
    fail_exists: Mutex<Option<BackendError>>,
    fail_create: Mutex<Option<BackendError>>,
    fail_upload: Mutex<Option<BackendError>>,
    fail_download: Mutex<Option<BackendError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        lock(&self.state).buckets.insert(bucket.into());
        self
    }

    pub fn with_upload_latency(mut self, latency: Duration) -> Self {
        self.upload_latency = latency;
        self
    }

    pub fn with_download_latency(mut self, latency: Duration) -> Self {
        self.download_latency = latency;
        self
    }

    /// Fail uploads whose source file is missing, as the real backend does.
    pub fn require_source_files(mut self) -> Self {
        self.strict_sources = true;
        self
    }

    /// The next existence check fails with `err`.
    pub fn fail_bucket_exists(self, err: BackendError) -> Self {
        *lock(&self.fail_exists) = Some(err);
        self
    }

    pub fn fail_create_bucket(self, err: BackendError) -> Self {
        *lock(&self.fail_create) = Some(err);
        self
    }

    pub fn fail_upload(self, err: BackendError) -> Self {
        *lock(&self.fail_upload) = Some(err);
        self
    }

    pub fn fail_download(self, err: BackendError) -> Self {
        *lock(&self.fail_download) = Some(err);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.state).calls.clone()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        lock(&self.state).buckets.contains(bucket)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.state)
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn record(&self, call: StoreCall) {
        lock(&self.state).calls.push(call);
    }
}

async fn simulate(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        self.record(StoreCall::BucketExists(bucket.to_string()));
        if let Some(err) = lock(&self.fail_exists).take() {
            return Err(err);
        }
        Ok(self.has_bucket(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        self.record(StoreCall::CreateBucket(bucket.to_string()));
        if let Some(err) = lock(&self.fail_create).take() {
            return Err(err);
        }
        lock(&self.state).buckets.insert(bucket.to_string());
        Ok(())
    }

    async fn upload_object(&self, bucket: &str, key: &str, source: &Path)
        -> Result<(), BackendError> {
        self.record(StoreCall::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            path: source.to_path_buf(),
        });
        simulate(self.upload_latency).await;
        if let Some(err) = lock(&self.fail_upload).take() {
            return Err(err);
        }
        if !self.has_bucket(bucket) {
            return Err(BackendError::NotFound(format!("bucket {}", bucket)));
        }

        let body = if self.strict_sources || source.exists() {
            fs::read(source)
                .await
                .map_err(|e| BackendError::io(source, e))?
        } else {
            Vec::new()
        };

        lock(&self.state)
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn download_object(&self, bucket: &str, key: &str, dest: &Path)
        -> Result<(), BackendError> {
        self.record(StoreCall::Download {
            bucket: bucket.to_string(),
            key: key.to_string(),
            path: dest.to_path_buf(),
        });
        simulate(self.download_latency).await;
        if let Some(err) = lock(&self.fail_download).take() {
            return Err(err);
        }

        let body = self
            .object(bucket, key)
            .ok_or_else(|| BackendError::NotFound(format!("{}/{}", bucket, key)))?;

        fs::write(dest, body)
            .await
            .map_err(|e| BackendError::io(dest, e))
    }
}
