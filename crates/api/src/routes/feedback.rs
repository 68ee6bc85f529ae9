//! Community feedback routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;
use mycoguard_core::feedback::FeedbackEntry;

/// Body of `POST /feedback`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    /// Image the feedback is about.
    pub image_id: Uuid,
    /// Feedback text.
    #[serde(default)]
    pub text: String,
}

/// Body of `PUT /feedback/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Requested status, checked by the moderation rules.
    #[serde(default)]
    pub status: String,
}

/// Feedback routes readable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/feedback/public", get(public_feedback))
        .route("/feedback/recent", get(recent_feedback))
}

/// Feedback routes that need a token.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feedback", post(submit_feedback).get(list_feedback))
        .route("/feedback/user", get(my_feedback))
        .route("/feedback/image/{id}", get(image_feedback))
        .route("/feedback/{id}/status", put(update_status))
        .route("/feedback/{id}", delete(delete_feedback))
}

/// POST /feedback - Submit feedback on an image.
async fn submit_feedback(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<SubmitFeedbackRequest>,
) -> ApiResult<(StatusCode, Json<FeedbackEntry>)> {
    let entry = state
        .feedback()
        .submit(&auth.caller(), payload.image_id, &payload.text)
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /feedback - Every entry in every state. Admin only.
async fn list_feedback(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<FeedbackEntry>>> {
    Ok(Json(state.feedback().list_all(&auth.caller()).await?))
}

/// GET /feedback/user - Entries written by the caller.
async fn my_feedback(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<FeedbackEntry>>> {
    Ok(Json(state.feedback().mine(&auth.caller()).await?))
}

/// GET /feedback/image/{id} - Entries on one image.
async fn image_feedback(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(image_id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<FeedbackEntry>>> {
    Ok(Json(
        state.feedback().for_image(&auth.caller(), image_id).await?,
    ))
}

/// PUT /feedback/{id}/status - Approve or reject a pending entry.
async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateStatusRequest>,
) -> ApiResult<Json<FeedbackEntry>> {
    let entry = state
        .feedback()
        .update_status(&auth.caller(), id, &payload.status)
        .await?;

    Ok(Json(entry))
}

/// DELETE /feedback/{id} - Remove an entry. Author or admin.
async fn delete_feedback(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.feedback().delete(&auth.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /feedback/public - Every approved entry.
async fn public_feedback(State(state): State<AppState>) -> ApiResult<Json<Vec<FeedbackEntry>>> {
    Ok(Json(state.feedback().public().await?))
}

/// GET /feedback/recent - The latest approved entries.
async fn recent_feedback(State(state): State<AppState>) -> ApiResult<Json<Vec<FeedbackEntry>>> {
    Ok(Json(state.feedback().recent().await?))
}
