use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one successful round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub bucket: String,
    pub key: String,
    pub source: PathBuf,
    pub download_path: PathBuf,

    /// Bucket reconciliation plus upload, in seconds
    pub upload_seconds: f64,

    pub download_seconds: f64,

    /// Always `upload_seconds + download_seconds`
    pub total_seconds: f64,

    /// Whether the bucket had to be created during this probe
    pub bucket_created: bool,

    /// Wall-clock start, for correlating with other logs. Not used for timing.
    pub started_at: DateTime<Utc>,
}
