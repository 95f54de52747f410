//! Session error types

use thiserror::Error;

use super::models::SessionState;
use crate::review::errors::{SchedulerError, StorageError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot start a session without cards")]
    EmptySession,

    #[error("Cannot {action} while the session is {from}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },

    #[error("Another operation is still in progress")]
    OperationInProgress,

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// Storage failures can be retried; everything else is a caller error
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_storage_errors_are_retryable() {
        assert!(SessionError::from(StorageError::Unavailable("offline".into())).is_retryable());
        assert!(SessionError::from(StorageError::QuotaExceeded("full".into())).is_retryable());
        assert!(!SessionError::from(StorageError::Incompatible("v9".into())).is_retryable());
        assert!(!SessionError::from(SchedulerError::InvalidGrade(7)).is_retryable());
        assert!(!SessionError::OperationInProgress.is_retryable());
    }
}
