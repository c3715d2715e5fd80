// Object Canary - synthetic round-trip probe for object storage

pub mod canary;
pub mod config;
pub mod credentials;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use canary::{Canary, ProbeObserver, ProbeReport, TracingObserver};
pub use config::{Config, StorageConfig};
pub use credentials::Credentials;
pub use storage::{MockStore, ObjectStore, S3Store};
pub use types::{BackendError, CanaryError, CanaryResult, ConfigurationError, Phase, TransferError};
