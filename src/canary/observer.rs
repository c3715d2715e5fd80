// Probe observers: the engine's only logging surface

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::report::ProbeReport;
use crate::types::{Phase, TransferError};

/// Receives structured events from a [`Canary`](super::Canary).
///
/// Every method has a no-op default so observers only implement what they
/// care about.
pub trait ProbeObserver: Send + Sync {
    fn phase_started(&self, _phase: Phase, _bucket: &str, _key: &str, _path: &Path) {}

    fn bucket_created(&self, _bucket: &str) {}

    fn phase_finished(&self, _phase: Phase, _seconds: f64) {}

    fn phase_failed(&self, _error: &TransferError) {}

    fn probe_finished(&self, _report: &ProbeReport) {}
}

impl<T: ProbeObserver + ?Sized> ProbeObserver for Arc<T> {
    fn phase_started(&self, phase: Phase, bucket: &str, key: &str, path: &Path) {
        (**self).phase_started(phase, bucket, key, path)
    }

    fn bucket_created(&self, bucket: &str) {
        (**self).bucket_created(bucket)
    }

    fn phase_finished(&self, phase: Phase, seconds: f64) {
        (**self).phase_finished(phase, seconds)
    }

    fn phase_failed(&self, error: &TransferError) {
        (**self).phase_failed(error)
    }

    fn probe_finished(&self, report: &ProbeReport) {
        (**self).probe_finished(report)
    }
}

/// Emits `tracing` events; whichever subscriber the process installed
/// decides where they go.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProbeObserver for TracingObserver {
    fn phase_started(&self, phase: Phase, bucket: &str, key: &str, path: &Path) {
        info!(%phase, bucket, key, path = %path.display(), "starting transfer");
    }

    fn bucket_created(&self, bucket: &str) {
        info!(bucket, "created bucket");
    }

    fn phase_finished(&self, phase: Phase, seconds: f64) {
        info!(%phase, seconds, "transfer finished");
    }

    fn phase_failed(&self, error: &TransferError) {
        warn!(phase = %error.phase, error = %error.source, "transfer failed");
    }

    fn probe_finished(&self, report: &ProbeReport) {
        info!(
            bucket = %report.bucket,
            key = %report.key,
            upload_seconds = report.upload_seconds,
            download_seconds = report.download_seconds,
            total_seconds = report.total_seconds,
            "round trip finished"
        );
    }
}
