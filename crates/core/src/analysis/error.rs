//! Analysis error types.

use mycoguard_shared::{AppError, Diagnostic};
use thiserror::Error;
use uuid::Uuid;

use super::fetch::FetchError;
use crate::classifier::InvocationFailure;
use crate::image::ImageError;

/// Errors that end an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Image not found.
    #[error("image not found: {0}")]
    NotFound(Uuid),

    /// Caller is neither the owner nor an admin.
    #[error("not authorized to analyze image {0}")]
    Forbidden(Uuid),

    /// Another analysis of the same image is running here.
    #[error("analysis already in progress for image {0}")]
    InProgress(Uuid),

    /// The image's classification changed while this analysis ran.
    #[error("image {0} was analyzed concurrently")]
    Superseded(Uuid),

    /// The scratch file could not be created.
    #[error("scratch file error: {0}")]
    Scratch(#[source] std::io::Error),

    /// Downloading the image failed.
    #[error("image download failed: {0}")]
    Download(#[from] FetchError),

    /// The classifier failed.
    #[error(transparent)]
    Classifier(#[from] InvocationFailure),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl AnalysisError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Forbidden(_) => 403,
            Self::InProgress(_) | Self::Superseded(_) => 409,
            Self::Scratch(_) | Self::Download(_) | Self::Classifier(_) | Self::Repository(_) => 500,
        }
    }

    /// Returns the error code for logs and API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "IMAGE_NOT_FOUND",
            Self::Forbidden(_) => "IMAGE_FORBIDDEN",
            Self::InProgress(_) => "ANALYSIS_IN_PROGRESS",
            Self::Superseded(_) => "ANALYSIS_SUPERSEDED",
            Self::Scratch(_) => "SCRATCH_FILE_ERROR",
            Self::Download(_) => "IMAGE_DOWNLOAD_FAILED",
            Self::Classifier(failure) => failure.error_code(),
            Self::Repository(_) => "DATABASE_ERROR",
        }
    }
}

impl From<ImageError> for AnalysisError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::NotFound(id) => Self::NotFound(id),
            ImageError::Forbidden(id) => Self::Forbidden(id),
            other => Self::Repository(other.to_string()),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::NotFound(_) => Self::NotFound("Image not found".to_string()),
            AnalysisError::Forbidden(_) => {
                Self::Forbidden("Not authorized to analyze this image".to_string())
            }
            AnalysisError::InProgress(_) => {
                Self::Conflict("Analysis already in progress for this image".to_string())
            }
            AnalysisError::Superseded(_) => {
                Self::Conflict("Image was analyzed concurrently, retry to re-analyze".to_string())
            }
            AnalysisError::Scratch(e) => Self::Internal(format!("scratch file: {e}")),
            AnalysisError::Download(e) => Self::upstream(
                "Failed to download image for analysis",
                Some(Diagnostic::Error(e.to_string())),
            ),
            AnalysisError::Classifier(failure) => failure.into(),
            AnalysisError::Repository(msg) => Self::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_map_to_409() {
        let id = Uuid::new_v4();
        for err in [AnalysisError::InProgress(id), AnalysisError::Superseded(id)] {
            assert_eq!(err.status_code(), 409);
            assert_eq!(AppError::from(err).error_code(), "CONFLICT");
        }
    }

    #[test]
    fn test_classifier_failure_keeps_its_message() {
        let err = AnalysisError::from(InvocationFailure::NonZeroExit {
            code: Some(1),
            stderr: "model load error".into(),
        });

        assert_eq!(err.error_code(), "CLASSIFIER_FAILED");
        let app = AppError::from(err);
        assert_eq!(app.public_message(), "Classification process failed");
    }

    #[test]
    fn test_download_failure_carries_diagnostic() {
        let app = AppError::from(AnalysisError::Download(FetchError::Status(403)));

        let AppError::Upstream {
            diagnostic: Some(Diagnostic::Error(text)),
            ..
        } = app
        else {
            panic!("expected upstream failure");
        };
        assert!(text.contains("403"));
    }
}
