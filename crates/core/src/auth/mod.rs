//! Identity, roles, and access decisions.
//!
//! This module provides:
//! - Password hashing with Argon2id
//! - User role definitions and the authenticated [`Caller`]
//! - Ownership guards for images, feedback, and user administration

mod guard;
mod password;

pub use guard::{can_access, can_change_role, can_delete_user, can_edit_user};
pub use password::{PasswordError, hash_password, verify_password};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular account, sees only its own images.
    #[default]
    User,
    /// Administrator, sees everything and moderates feedback.
    Admin,
}

impl UserRole {
    /// Returns the role name as stored and carried in tokens.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parses a role name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns true if this role can moderate feedback and manage users.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated identity a request acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// Caller's user id.
    pub user_id: Uuid,
    /// Caller's role.
    pub role: UserRole,
}

impl Caller {
    /// Creates a caller.
    #[must_use]
    pub const fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Builds a caller from token claims. Unrecognized roles get no privileges.
    #[must_use]
    pub fn from_token(user_id: Uuid, role: &str) -> Self {
        Self::new(user_id, UserRole::parse(role).unwrap_or_default())
    }

    /// Returns true if the caller is an administrator.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Returns true if the caller may act on a resource owned by `owner_id`.
    #[must_use]
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        can_access(owner_id, self.user_id, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_round_trip() {
        for role in [UserRole::User, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("owner"), None);
    }

    #[test]
    fn test_caller_from_unknown_role_is_plain_user() {
        let caller = Caller::from_token(Uuid::new_v4(), "superuser");
        assert_eq!(caller.role, UserRole::User);
        assert!(!caller.is_admin());
    }
}
