//! Feedback error types.

use mycoguard_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

use super::types::FeedbackStatus;
use crate::image::ImageError;

/// Feedback operation errors.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// Feedback entry not found.
    #[error("feedback not found: {0}")]
    NotFound(Uuid),

    /// Target image not found.
    #[error("image not found: {0}")]
    ImageNotFound(Uuid),

    /// Caller may not perform the operation.
    #[error("{0}")]
    Forbidden(String),

    /// Requested status is not a moderation outcome.
    #[error("invalid feedback status '{0}'")]
    InvalidStatus(String),

    /// Feedback text is blank.
    #[error("feedback text is required")]
    EmptyText,

    /// Entry already left the pending state.
    #[error("cannot move feedback from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: FeedbackStatus,
        /// Requested status.
        to: FeedbackStatus,
    },

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl FeedbackError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidStatus(_) | Self::EmptyText => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) | Self::ImageNotFound(_) => 404,
            Self::InvalidTransition { .. } => 409,
            Self::Repository(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "FEEDBACK_NOT_FOUND",
            Self::ImageNotFound(_) => "IMAGE_NOT_FOUND",
            Self::Forbidden(_) => "FEEDBACK_FORBIDDEN",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::EmptyText => "TEXT_REQUIRED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Repository(_) => "DATABASE_ERROR",
        }
    }
}

impl From<ImageError> for FeedbackError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::NotFound(id) => Self::ImageNotFound(id),
            ImageError::Forbidden(_) => {
                Self::Forbidden("Not authorized to access this image".to_string())
            }
            other => Self::Repository(other.to_string()),
        }
    }
}

impl From<FeedbackError> for AppError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::NotFound(_) => Self::NotFound("Feedback not found".to_string()),
            FeedbackError::ImageNotFound(_) => Self::NotFound("Image not found".to_string()),
            FeedbackError::Forbidden(msg) => Self::Forbidden(msg),
            FeedbackError::InvalidStatus(_) => {
                Self::invalid_field("status", "Status must be 'approved' or 'rejected'")
            }
            FeedbackError::EmptyText => Self::invalid_field("text", "Feedback text is required"),
            FeedbackError::InvalidTransition { from, .. } => {
                Self::Conflict(format!("Feedback has already been {from}"))
            }
            FeedbackError::Repository(msg) => Self::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FeedbackError::NotFound(Uuid::nil()), 404)]
    #[case(FeedbackError::Forbidden("no".into()), 403)]
    #[case(FeedbackError::InvalidStatus("pending".into()), 400)]
    #[case(FeedbackError::EmptyText, 400)]
    #[case(FeedbackError::InvalidTransition { from: FeedbackStatus::Approved, to: FeedbackStatus::Rejected }, 409)]
    #[case(FeedbackError::repository("boom"), 500)]
    fn test_status_code_matches_app_error(#[case] err: FeedbackError, #[case] status: u16) {
        assert_eq!(err.status_code(), status);
        assert_eq!(AppError::from(err).status_code(), status);
    }

    #[test]
    fn test_invalid_status_names_the_field() {
        let AppError::Validation { fields, .. } =
            AppError::from(FeedbackError::InvalidStatus("maybe".into()))
        else {
            panic!("expected validation error");
        };
        assert_eq!(fields[0].field, "status");
    }
}
