//! User repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::{sea_orm_active_enums::UserRole as DbUserRole, users};
use mycoguard_core::auth::UserRole;
use mycoguard_shared::auth::UserInfo;

/// Fields to change on a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    /// New display name.
    pub name: Option<String>,
    /// New email.
    pub email: Option<String>,
    /// New role.
    pub role: Option<UserRole>,
}

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id).one(&self.db).await
    }

    /// Lists every user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<users::Model>, DbErr> {
        users::Entity::find()
            .order_by_desc(users::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails (including a duplicate
    /// email).
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<users::Model, DbErr> {
        let now = chrono::Utc::now().into();
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            role: Set(to_db_role(role)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user.insert(&self.db).await
    }

    /// Applies `changes` to a user. Returns `None` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<users::Model>, DbErr> {
        let Some(model) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut user = model.into_active_model();
        if let Some(name) = changes.name {
            user.name = Set(name);
        }
        if let Some(email) = changes.email {
            user.email = Set(email);
        }
        if let Some(role) = changes.role {
            user.role = Set(to_db_role(role));
        }
        user.updated_at = Set(chrono::Utc::now().into());

        user.update(&self.db).await.map(Some)
    }

    /// Deletes a user row. Images and feedback cascade in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbErr> {
        let result = users::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Checks if an email is already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn email_exists(&self, email: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Checks whether any admin account exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn admin_exists(&self) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Role.eq(DbUserRole::Admin))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }
}

/// Convert domain role to database enum.
pub(crate) const fn to_db_role(role: UserRole) -> DbUserRole {
    match role {
        UserRole::User => DbUserRole::User,
        UserRole::Admin => DbUserRole::Admin,
    }
}

/// Convert database role to domain enum.
#[must_use]
pub const fn from_db_role(role: DbUserRole) -> UserRole {
    match role {
        DbUserRole::User => UserRole::User,
        DbUserRole::Admin => UserRole::Admin,
    }
}

impl From<users::Model> for UserInfo {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: from_db_role(model.role).as_str().to_string(),
            created_at: model.created_at.into(),
        }
    }
}
