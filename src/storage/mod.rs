// Storage layer: the object-store capability the canary probes

use async_trait::async_trait;
use std::path::Path;

use crate::types::BackendError;

pub mod mock;
pub mod s3_client;

pub use mock::{MockStore, StoreCall};
pub use s3_client::S3Store;

/// The four operations a probe needs from an object-storage backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `Ok(false)` when the bucket does not exist; other failures are errors.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError>;

    /// Must succeed when the bucket already exists and is owned by the caller.
    async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError>;

    /// Upload the file at `source`, replacing any object already under `key`.
    async fn upload_object(&self, bucket: &str, key: &str, source: &Path)
        -> Result<(), BackendError>;

    /// Download the object into `dest`, overwriting it if present.
    async fn download_object(&self, bucket: &str, key: &str, dest: &Path)
        -> Result<(), BackendError>;
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Box<T> {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        (**self).bucket_exists(bucket).await
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        (**self).create_bucket(bucket).await
    }

    async fn upload_object(&self, bucket: &str, key: &str, source: &Path)
        -> Result<(), BackendError> {
        (**self).upload_object(bucket, key, source).await
    }

    async fn download_object(&self, bucket: &str, key: &str, dest: &Path)
        -> Result<(), BackendError> {
        (**self).download_object(bucket, key, dest).await
    }
}
