//! Error types shared by the storage layer and the moderation queue.

use thiserror::Error;

use crate::caption::CaptionId;

/// Failure reported by a [`CaptionRepository`](crate::repository::CaptionRepository).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backend failed while performing `operation`.
    #[error("storage error during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    /// A stored row could not be decoded.
    #[error("corrupt {what} in database")]
    Corruption { what: &'static str },

    /// An insert collided with a UNIQUE constraint on `field`.
    #[error("unique constraint violated on {field}")]
    UniqueViolation { field: &'static str },
}

impl RepositoryError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }

    pub fn corruption(what: &'static str) -> Self {
        Self::Corruption { what }
    }
}

/// Outcome taxonomy of moderation queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A caption with the same text already exists. Recoverable by the user.
    #[error("caption already exists")]
    Duplicate,

    /// The referenced caption does not exist (any more).
    #[error("caption {0} not found")]
    NotFound(CaptionId),

    /// There is no approved caption to draw from.
    #[error("no approved captions")]
    NoneApproved,

    #[error("internal error: {0}")]
    Internal(#[from] RepositoryError),
}

impl QueueError {
    /// True for both flavours of "not found": a missing id or an empty
    /// approved set.
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueueError::NotFound(_) | QueueError::NoneApproved)
    }
}
