//! Startup tasks.

use sea_orm::DatabaseConnection;
use tracing::info;

use crate::error::ApiError;
use mycoguard_core::auth::{UserRole, hash_password};
use mycoguard_db::UserRepository;
use mycoguard_shared::config::AdminConfig;

/// Display name of the bootstrapped administrator.
pub const BOOTSTRAP_ADMIN_NAME: &str = "Admin";

/// Creates the first administrator if none exists and credentials are
/// configured. Returns true if an account was created.
///
/// An existing user with the configured email is left alone.
pub async fn ensure_admin(db: &DatabaseConnection, config: &AdminConfig) -> Result<bool, ApiError> {
    let Some((email, password)) = config.credentials() else {
        return Ok(false);
    };

    let users = UserRepository::new(db.clone());
    if users.admin_exists().await? {
        return Ok(false);
    }

    let email = email.trim().to_lowercase();
    if users.email_exists(&email).await? {
        tracing::warn!("Admin email already belongs to a regular user; skipping bootstrap");
        return Ok(false);
    }

    let password_hash = hash_password(password)?;
    let admin = users
        .create(BOOTSTRAP_ADMIN_NAME, &email, &password_hash, UserRole::Admin)
        .await?;

    info!(user_id = %admin.id, "Bootstrap admin created");
    Ok(true)
}
