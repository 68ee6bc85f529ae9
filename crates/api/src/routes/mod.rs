//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};

pub mod auth;
pub mod feedback;
pub mod health;
pub mod images;
pub mod labels;
pub mod users;

/// Creates the API router. Everything outside the public set requires a
/// bearer token.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let max_file_size = state.storage.config().max_file_size;

    let protected_routes = Router::new()
        .merge(auth::protected_routes())
        .merge(images::routes(max_file_size))
        .merge(feedback::routes())
        .merge(users::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(labels::routes())
        .merge(auth::routes())
        .merge(feedback::public_routes())
        .merge(protected_routes)
}
