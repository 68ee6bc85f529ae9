//! Authentication routes for registration, login, and the current user.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tracing::info;
use validator::Validate;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use mycoguard_core::auth::{UserRole, hash_password, verify_password};
use mycoguard_db::{UserRepository, entities::users, from_db_role};
use mycoguard_shared::AppError;
use mycoguard_shared::auth::{AuthResponse, LoginRequest, RegisterRequest, UserInfo};

/// Public auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
}

/// Auth routes that need a token.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

/// Emails are compared case-insensitively.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Issues a token for `user` and builds the response.
fn issue(state: &AppState, user: users::Model) -> ApiResult<AuthResponse> {
    let role = from_db_role(user.role);
    let access_token = state
        .jwt_service
        .generate_access_token(user.id, role.as_str())?;

    Ok(AuthResponse {
        user: user.into(),
        access_token,
        expires_in: state.jwt_service.access_token_expires_in(),
    })
}

/// POST /auth/register - Create an account and return a token.
async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    payload.validate()?;

    let user_repo = UserRepository::new((*state.db).clone());
    let email = normalize_email(&payload.email);

    if user_repo.email_exists(&email).await? {
        return Err(AppError::Conflict("User already exists".to_string()).into());
    }

    let password_hash = hash_password(&payload.password)?;
    let user = user_repo
        .create(payload.name.trim(), &email, &password_hash, UserRole::User)
        .await?;

    info!(user_id = %user.id, "New user registered");

    Ok((StatusCode::CREATED, Json(issue(&state, user)?)))
}

/// POST /auth/login - Authenticate and return a token.
async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    payload.validate()?;

    let user_repo = UserRepository::new((*state.db).clone());
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let Some(user) = user_repo
        .find_by_email(&normalize_email(&payload.email))
        .await?
    else {
        info!("Login attempt for non-existent user");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        info!(user_id = %user.id, "Failed login attempt - invalid password");
        return Err(invalid());
    }

    info!(user_id = %user.id, "User logged in");
    Ok(Json(issue(&state, user)?))
}

/// GET /auth/me - The authenticated user.
async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserInfo>> {
    let user = UserRepository::new((*state.db).clone())
        .find_by_id(auth.user_id())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.into()))
}
