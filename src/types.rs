// Type definitions and error taxonomy

use std::path::PathBuf;

/// The timed phase of a probe an event or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Upload,
    Download,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Upload => write!(f, "upload"),
            Phase::Download => write!(f, "download"),
        }
    }
}

/// Raised before any I/O when the process is not set up to reach storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{0} not defined")]
    MissingVariable(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("storage client setup failed: {0}")]
    ClientSetup(String),
}

/// Failure reported by an [`ObjectStore`](crate::storage::ObjectStore).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage returned HTTP {code}: {message}")]
    Status { code: u16, message: String },

    #[error("local I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage client error: {0}")]
    Client(String),
}

impl BackendError {
    /// Whether this is the "does not exist" class of failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            BackendError::NotFound(_) => true,
            BackendError::Status { code, .. } => *code == 404,
            _ => false,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackendError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A backend failure tagged with the phase it interrupted.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed: {source}")]
pub struct TransferError {
    pub phase: Phase,
    #[source]
    pub source: BackendError,
}

impl TransferError {
    pub fn new(phase: Phase, source: BackendError) -> Self {
        Self { phase, source }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CanaryError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl CanaryError {
    /// The phase that failed, if the failure happened during a transfer.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            CanaryError::Configuration(_) => None,
            CanaryError::Transfer(e) => Some(e.phase),
        }
    }
}

pub type CanaryResult<T> = std::result::Result<T, CanaryError>;
