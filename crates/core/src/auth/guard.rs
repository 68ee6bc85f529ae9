//! Ownership and administration guards.
//!
//! These are pure decisions; callers map a `false` to a 403.

use uuid::Uuid;

use super::{Caller, UserRole};

/// Returns true iff the caller owns the resource or is an admin.
///
/// The single access rule for image read/analyze/delete, feedback on an
/// image, and feedback deletion by its author.
#[must_use]
pub fn can_access(resource_owner_id: Uuid, caller_id: Uuid, caller_role: UserRole) -> bool {
    caller_role.is_admin() || resource_owner_id == caller_id
}

/// Returns true if the caller may delete the target user account.
///
/// Only admins delete users, and an admin may not delete their own account.
#[must_use]
pub fn can_delete_user(target_id: Uuid, caller: &Caller) -> bool {
    caller.is_admin() && target_id != caller.user_id
}

/// Returns true if the caller may edit the target user's profile.
#[must_use]
pub fn can_edit_user(target_id: Uuid, caller: &Caller) -> bool {
    can_access(target_id, caller.user_id, caller.role)
}

/// Returns true if the caller may change anyone's role.
#[must_use]
pub const fn can_change_role(caller: &Caller) -> bool {
    caller.is_admin()
}
