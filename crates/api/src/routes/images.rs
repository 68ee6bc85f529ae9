//! Image upload, analysis, and retrieval routes.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
};
use bytes::Bytes;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiResult;
use crate::extract::ApiPath;
use crate::middleware::AuthUser;
use mycoguard_core::image::{Classification, Image, ImageDetails};
use mycoguard_shared::AppError;

/// Multipart field carrying the photo.
const UPLOAD_FIELD: &str = "image";

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Creates the images router.
pub fn routes(max_file_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_file_size.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    Router::new()
        .route(
            "/images/upload",
            post(upload_image).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/images/analyze/{id}", post(analyze_image))
        .route("/images", get(list_images))
        .route("/images/{id}", get(get_image).delete(delete_image))
}

/// The uploaded file taken from a multipart body.
struct UploadedFile {
    file_name: String,
    content_type: String,
    content: Bytes,
}

async fn read_upload(multipart: &mut Multipart) -> ApiResult<UploadedFile> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        tracing::debug!(error = %e, "rejected multipart body");
        AppError::invalid_field(UPLOAD_FIELD, "Invalid upload")
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("upload")
            .to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let content = field.bytes().await.map_err(invalid)?;

        if content.is_empty() {
            break;
        }

        return Ok(UploadedFile {
            file_name,
            content_type,
            content,
        });
    }

    Err(AppError::invalid_field(UPLOAD_FIELD, "No file uploaded").into())
}

/// POST /images/upload - Store a photo for the caller.
async fn upload_image(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Image>> {
    let file = read_upload(&mut multipart).await?;

    let image = state
        .images()
        .upload(&auth.caller(), &file.file_name, &file.content_type, file.content)
        .await?;

    Ok(Json(image))
}

/// POST /images/analyze/{id} - Classify a stored photo.
///
/// The analysis runs on its own task so a dropped connection does not abandon
/// the classifier process or the scratch file mid-way.
async fn analyze_image(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Classification>> {
    let analyzer = state.analyzer();
    let caller = auth.caller();

    let classification = tokio::spawn(async move { analyzer.analyze(id, &caller).await })
        .await
        .map_err(|e| AppError::Internal(format!("analysis task failed: {e}")))??;

    Ok(Json(classification))
}

/// GET /images - The caller's images, or all images for admins.
async fn list_images(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<ImageDetails>>> {
    Ok(Json(state.images().list(&auth.caller()).await?))
}

/// GET /images/{id} - One image with its classification.
async fn get_image(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ImageDetails>> {
    Ok(Json(state.images().get(id, &auth.caller()).await?))
}

/// DELETE /images/{id} - Remove an image, its object, and its classification.
async fn delete_image(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.images().delete(id, &auth.caller()).await?;
    Ok(StatusCode::NO_CONTENT)
}
