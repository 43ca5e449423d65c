// Domain errors - Error types for the domain layer

use thiserror::Error;

/// Domain-specific error types
#[derive(Debug, Error)]
pub enum DomainError {
    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// Crop/scale inputs that cannot produce a usable region. Never retried.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Overlay text carrying an unescaped filter separator
    #[error("Malformed overlay text: {0}")]
    MalformedOverlayText(String),

    /// Extraction window shorter than the minimum clip length
    #[error("Invalid clip window: {0}")]
    InvalidClipWindow(String),

    /// No recording matches the camera identifier
    #[error("No recording found for camera '{camera}' in {folder}")]
    AssetNotFound { camera: String, folder: String },

    /// Hardware capability probe errored or timed out
    #[error("Encoder probe failed: {0}")]
    ToolProbeFailed(String),

    /// One encoder attempt exited non-zero or could not be spawned
    #[error("{encoder} encode attempt failed: {message}")]
    AttemptFailed { encoder: String, message: String },

    /// All attempts exhausted
    #[error("Job failed: {0}")]
    Failed(String),

    /// Timestamp in an unsupported format
    #[error("Invalid time format: {0}. Expected HH:MM:SS, MM:SS, or seconds")]
    InvalidTimeFormat(String),

    /// Event sheet row that cannot be used
    #[error("Invalid row {line}: {message}")]
    InvalidRow { line: usize, message: String },

    /// Configuration file or value problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem failure
    #[error("Filesystem error: {0}")]
    FsFail(String),

    /// Media probe failure
    #[error("Probe failed: {0}")]
    ProbeFail(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DomainError {
    /// Whether a job ending in this error belongs in the retry batch
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::AttemptFailed { .. } | DomainError::Failed(_)
        )
    }
}

/// Result alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
