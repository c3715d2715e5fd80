// S3-compatible backend built on rust-s3

use async_trait::async_trait;
use s3::creds::Credentials as S3Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::ObjectStore;
use crate::config::StorageConfig;
use crate::credentials::Credentials;
use crate::types::{BackendError, ConfigurationError};

/// Talks to AWS S3 or any S3-compatible endpoint (MinIO, Ceph, ...).
#[derive(Clone)]
pub struct S3Store {
    region: Region,
    credentials: S3Credentials,
    path_style: bool,
}

impl S3Store {
    pub fn new(
        credentials: &Credentials,
        config: &StorageConfig,
    ) -> Result<Self, ConfigurationError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse::<Region>()
                .map_err(|_| ConfigurationError::InvalidValue {
                    name: "S3_REGION",
                    value: config.region.clone(),
                })?,
        };

        let credentials = S3Credentials::new(
            Some(credentials.access_key()),
            Some(credentials.secret_key()),
            None, // security token
            None, // session token
            None, // profile
        )
        .map_err(|e| ConfigurationError::ClientSetup(e.to_string()))?;

        Ok(Self {
            region,
            credentials,
            path_style: config.path_style,
        })
    }

    fn bucket(&self, name: &str) -> Result<Bucket, BackendError> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(map_s3_error)?;

        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

fn map_s3_error(err: S3Error) -> BackendError {
    match err {
        S3Error::HttpFailWithBody(404, body) => BackendError::NotFound(body),
        S3Error::HttpFailWithBody(code, body) => BackendError::Status {
            code,
            message: body,
        },
        other => BackendError::Client(other.to_string()),
    }
}

fn check_status(code: u16, body: &[u8]) -> Result<(), BackendError> {
    if (200..300).contains(&code) {
        return Ok(());
    }
    let message = String::from_utf8_lossy(body).into_owned();
    if code == 404 {
        Err(BackendError::NotFound(message))
    } else {
        Err(BackendError::Status { code, message })
    }
}

fn already_owned(code: u16, body: &str) -> bool {
    code == 409 && body.contains("BucketAlreadyOwnedByYou")
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        let handle = self.bucket(bucket)?;

        // A one-key listing stands in for HEAD bucket.
        match handle.list_page(String::new(), None, None, None, Some(1)).await {
            Ok((_, code)) if (200..300).contains(&code) => Ok(true),
            Ok((_, 404)) => Ok(false),
            Ok((_, code)) => Err(BackendError::Status {
                code,
                message: format!("unexpected status listing bucket {}", bucket),
            }),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(map_s3_error(e)),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        let config = BucketConfiguration::default();
        let region = self.region.clone();
        let credentials = self.credentials.clone();

        let result = if self.path_style {
            Bucket::create_with_path_style(bucket, region, credentials, config).await
        } else {
            Bucket::create(bucket, region, credentials, config).await
        };

        match result {
            Ok(resp) if (200..300).contains(&resp.response_code) => Ok(()),
            Ok(resp) if already_owned(resp.response_code, &resp.response_text) => {
                debug!(bucket, "bucket already owned");
                Ok(())
            }
            Ok(resp) => Err(BackendError::Status {
                code: resp.response_code,
                message: resp.response_text,
            }),
            Err(S3Error::HttpFailWithBody(code, body)) if already_owned(code, &body) => {
                debug!(bucket, "bucket already owned");
                Ok(())
            }
            Err(e) => Err(map_s3_error(e)),
        }
    }

    async fn upload_object(&self, bucket: &str, key: &str, source: &Path)
        -> Result<(), BackendError> {
        let data = fs::read(source)
            .await
            .map_err(|e| BackendError::io(source, e))?;

        let resp = self
            .bucket(bucket)?
            .put_object(key, &data)
            .await
            .map_err(map_s3_error)?;

        check_status(resp.status_code(), resp.bytes())
    }

    async fn download_object(&self, bucket: &str, key: &str, dest: &Path)
        -> Result<(), BackendError> {
        let resp = self
            .bucket(bucket)?
            .get_object(key)
            .await
            .map_err(map_s3_error)?;

        check_status(resp.status_code(), resp.bytes())?;

        fs::write(dest, &resp.bytes()[..])
            .await
            .map_err(|e| BackendError::io(dest, e))
    }
}
