//! Label presentation table.

use axum::{Json, Router, routing::get};

use crate::AppState;
use mycoguard_core::classifier::{LabelPresentation, presentation_table};

/// GET /labels - Display attributes for every classification label.
async fn list_labels() -> Json<Vec<&'static LabelPresentation>> {
    Json(presentation_table())
}

/// Creates the labels router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/labels", get(list_labels))
}
