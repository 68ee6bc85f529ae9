//! Request extractors whose rejections render as [`ApiError`].
//!
//! axum's own `Json` and `Path` answer malformed input with plain-text
//! bodies. These wrappers turn the same failures into `VALIDATION_ERROR`
//! responses, naming the offending field when it can be recovered.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Request,
        path::ErrorKind,
        rejection::{JsonRejection, PathRejection},
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use mycoguard_shared::AppError;

/// JSON request body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await?;
        serde_path_to_error::deserialize(value)
            .map(ApiJson)
            .map_err(|e| ApiError(body_field_error(&e)))
    }
}

/// Typed path parameters.
#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

fn body_field_error(err: &serde_path_to_error::Error<serde_json::Error>) -> AppError {
    let inner = err.inner().to_string();
    let path = err.path().to_string();

    if let Some(field) = missing_field(&inner) {
        let field = if path == "." {
            field.to_string()
        } else {
            format!("{path}.{field}")
        };
        return AppError::invalid_field(field.clone(), format!("{field} is required"));
    }

    if path == "." {
        return AppError::validation("Invalid request body");
    }
    AppError::invalid_field(path.clone(), format!("Invalid value for {path}"))
}

/// Field name from serde's "missing field `x`" message.
fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        match rejection {
            JsonRejection::MissingJsonContentType(_) => Self(AppError::validation(
                "Expected request with `Content-Type: application/json`",
            )),
            JsonRejection::JsonSyntaxError(_) => {
                Self(AppError::validation("Malformed JSON in request body"))
            }
            other => Self(AppError::validation(other.body_text())),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(err) => match err.kind() {
                ErrorKind::ParseErrorAtKey { key, .. }
                | ErrorKind::DeserializeError { key, .. }
                | ErrorKind::InvalidUtf8InPathParam { key } => {
                    Self(AppError::invalid_field(key.clone(), format!("Invalid {key}")))
                }
                _ => Self(AppError::validation("Invalid path parameter")),
            },
            other => Self(AppError::Internal(other.body_text())),
        }
    }
}
