//! Queue error types and error categorization.
//!
//! Errors are categorized to determine retry behavior:
//! - **Transient**: temporary failures, rescheduled with exponential backoff
//! - **Permanent**: unrecoverable for this entry, dead-lettered immediately

use thiserror::Error;
use uuid::Uuid;

/// Category of error for determining retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure - reschedule with backoff until retries run out
    Transient,
    /// Unrecoverable error - dead-letter without retrying
    Permanent,
}

impl ErrorCategory {
    pub fn should_retry(&self) -> bool {
        matches!(self, ErrorCategory::Transient)
    }
}

/// Queue processing errors
#[derive(Error, Debug)]
pub enum QueueError {
    /// Entry does not exist in the store
    #[error("Entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Optimistic lock failure: another worker won the transition race
    #[error("Version conflict on entry {id}: expected {expected}, found {actual}")]
    VersionConflict { id: Uuid, expected: u64, actual: u64 },

    /// Transition not allowed from the entry's current status
    #[error("Invalid transition for entry {id} in status {status}")]
    InvalidTransition { id: Uuid, status: String },

    /// Payload snapshot could not be deserialized
    #[error("Payload error: {0}")]
    Payload(String),

    /// Entry processing failed
    #[error("Processing error: {message}")]
    Processing {
        message: String,
        category: ErrorCategory,
    },

    /// Store-level error (I/O, backend unavailable)
    #[error("Store error: {0}")]
    Store(String),
}

pub type QueueResult<T> = Result<T, QueueError>;

impl QueueError {
    /// Create a transient processing error
    pub fn transient(message: impl Into<String>) -> Self {
        QueueError::Processing {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// Create a permanent processing error
    pub fn permanent(message: impl Into<String>) -> Self {
        QueueError::Processing {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            QueueError::EntryNotFound(_) => ErrorCategory::Permanent,
            QueueError::VersionConflict { .. } => ErrorCategory::Transient,
            QueueError::InvalidTransition { .. } => ErrorCategory::Permanent,
            QueueError::Payload(_) => ErrorCategory::Permanent,
            QueueError::Processing { category, .. } => *category,
            QueueError::Store(_) => ErrorCategory::Transient,
        }
    }

    /// Whether the race for an entry was lost to another worker (benign)
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, QueueError::VersionConflict { .. })
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Payload(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(QueueError::transient("x").category(), ErrorCategory::Transient);
        assert_eq!(QueueError::permanent("x").category(), ErrorCategory::Permanent);
        assert_eq!(QueueError::Payload("bad json".into()).category(), ErrorCategory::Permanent);
        assert_eq!(QueueError::Store("io".into()).category(), ErrorCategory::Transient);
    }

    #[test]
    fn test_should_retry() {
        assert!(ErrorCategory::Transient.should_retry());
        assert!(!ErrorCategory::Permanent.should_retry());
    }

    #[test]
    fn test_version_conflict_detection() {
        let err = QueueError::VersionConflict {
            id: Uuid::new_v4(),
            expected: 2,
            actual: 3,
        };
        assert!(err.is_version_conflict());
        assert!(err.category().should_retry());
    }
}
