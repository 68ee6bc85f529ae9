//! User administration routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;
use mycoguard_core::auth::{UserRole, can_change_role, can_delete_user, can_edit_user};
use mycoguard_db::{UserChanges, UserRepository};
use mycoguard_shared::AppError;
use mycoguard_shared::auth::{UpdateUserRequest, UserInfo};

/// Creates the users router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn require_admin(auth: &AuthUser) -> ApiResult<()> {
    if auth.caller().is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin access required"))
    }
}

/// GET /users - All users, newest first. Admin only.
async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<UserInfo>>> {
    require_admin(&auth)?;

    let users = UserRepository::new((*state.db).clone()).list().await?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}

/// GET /users/{id} - One user. Admin only.
async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<UserInfo>> {
    require_admin(&auth)?;

    let user = UserRepository::new((*state.db).clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.into()))
}

/// PUT /users/{id} - Update a profile. Self or admin; only admins change roles.
async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserInfo>> {
    let caller = auth.caller();
    if !can_edit_user(id, &caller) {
        return Err(ApiError::forbidden("Not authorized to update this user"));
    }
    payload.validate()?;

    let role = match payload.role.as_deref() {
        Some(raw) if can_change_role(&caller) => Some(
            UserRole::parse(raw.trim())
                .ok_or_else(|| AppError::invalid_field("role", "Role must be 'user' or 'admin'"))?,
        ),
        _ => None,
    };

    let user_repo = UserRepository::new((*state.db).clone());

    let email = payload.email.map(|e| e.trim().to_lowercase());
    if let Some(email) = &email
        && let Some(existing) = user_repo.find_by_email(email).await?
        && existing.id != id
    {
        return Err(AppError::Conflict("Email is already in use".to_string()).into());
    }

    let changes = UserChanges {
        name: payload.name.map(|n| n.trim().to_string()),
        email,
        role,
    };

    let user = user_repo
        .update(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %id, updated_by = %caller.user_id, "User updated");
    Ok(Json(user.into()))
}

/// DELETE /users/{id} - Remove a user and their images. Admin only, not self.
async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let caller = auth.caller();
    if !can_delete_user(id, &caller) {
        return Err(ApiError::forbidden("Not authorized to delete this user"));
    }

    let user_repo = UserRepository::new((*state.db).clone());
    if user_repo.find_by_id(id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    // Stored objects go through the image delete path; rows cascade anyway.
    let removed = state.images().delete_all_for_owner(id).await?;
    user_repo.delete(id).await?;

    info!(user_id = %id, images = removed, deleted_by = %caller.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
