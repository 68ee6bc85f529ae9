//! HTTP error responses.
//!
//! Handlers return `Result<T, ApiError>`. Every domain error converts into
//! the shared [`AppError`] taxonomy first, so status codes and error codes
//! are decided in one place.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;

use mycoguard_core::analysis::AnalysisError;
use mycoguard_core::auth::PasswordError;
use mycoguard_core::feedback::FeedbackError;
use mycoguard_core::image::ImageError;
use mycoguard_core::storage::StorageError;
use mycoguard_shared::{AppError, JwtError};

/// Result type for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned from route handlers.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Shortcut for a 401 with the given message.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(AppError::Unauthorized(message.into()))
    }

    /// Shortcut for a 403 with the given message.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self(AppError::Forbidden(message.into()))
    }

    /// Shortcut for a 404 with the given message.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self(AppError::NotFound(message.into()))
    }

    /// JSON body for this error.
    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("code".into(), json!(self.0.error_code()));
        body.insert("message".into(), json!(self.0.public_message()));

        match &self.0 {
            AppError::Validation { fields, .. } if !fields.is_empty() => {
                body.insert("errors".into(), json!(fields));
            }
            AppError::Upstream {
                diagnostic: Some(diagnostic),
                ..
            } => {
                body.insert(diagnostic.field_name().into(), json!(diagnostic.text()));
            }
            _ => {}
        }

        Value::Object(body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.error_code(), "Request error");
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

macro_rules! via_app_error {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for ApiError {
                fn from(err: $ty) -> Self {
                    Self(AppError::from(err))
                }
            }
        )+
    };
}

via_app_error!(
    AnalysisError,
    FeedbackError,
    ImageError,
    StorageError,
    PasswordError,
    validator::ValidationErrors,
);

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self(AppError::Database(err.to_string()))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::unauthorized("Token has expired"),
            JwtError::DecodingError(_) => Self::unauthorized("Invalid or malformed token"),
            JwtError::EncodingError(msg) => Self(AppError::Internal(msg)),
        }
    }
}
