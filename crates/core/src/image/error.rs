//! Image error types.

use mycoguard_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StorageError;

/// Image operation errors.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Image not found.
    #[error("image not found: {0}")]
    NotFound(Uuid),

    /// Caller is neither the owner nor an admin.
    #[error("not authorized to access image {0}")]
    Forbidden(Uuid),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl ImageError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Forbidden(_) => 403,
            Self::Storage(StorageError::FileTooLarge { .. } | StorageError::InvalidMimeType { .. }) => {
                400
            }
            Self::Storage(_) | Self::Repository(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "IMAGE_NOT_FOUND",
            Self::Forbidden(_) => "IMAGE_FORBIDDEN",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Repository(_) => "DATABASE_ERROR",
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::NotFound(_) => Self::NotFound("Image not found".to_string()),
            ImageError::Forbidden(_) => {
                Self::Forbidden("Not authorized to access this image".to_string())
            }
            ImageError::Storage(e) => e.into(),
            ImageError::Repository(msg) => Self::Database(msg),
        }
    }
}
