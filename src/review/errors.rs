//! Review scheduling and storage error types

use thiserror::Error;

/// Errors raised by the scheduler. Both are caller errors: reinitialize the
/// state (or fix the grade) and retry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Invalid grade {0}: expected an integer between 0 and 5")]
    InvalidGrade(i32),

    #[error("Invalid review state: {0}")]
    InvalidState(String),
}

/// Errors reported by review state persistence
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Incompatible data: {0}")]
    Incompatible(String),
}

impl StorageError {
    /// Environment failures leave in-memory state usable; the write can be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable(_) | StorageError::QuotaExceeded(_)
        )
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::StorageFull | std::io::ErrorKind::FileTooLarge => {
                StorageError::QuotaExceeded(err.to_string())
            }
            _ => StorageError::Unavailable(err.to_string()),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
