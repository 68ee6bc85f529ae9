//! Moderation state machine for feedback.
//!
//! ```text
//! pending ──► approved
//!    │
//!    └──────► rejected
//! ```
//!
//! Both outcomes are terminal. Only admins moderate.

use super::error::FeedbackError;
use super::types::FeedbackStatus;
use crate::auth::Caller;

/// Stateless transition rules for feedback moderation.
pub struct Moderation;

impl Moderation {
    /// Parses a requested moderation outcome.
    ///
    /// Only `approved` and `rejected` are accepted; `pending` is a valid
    /// status but not a valid target.
    pub fn parse_target(raw: &str) -> Result<FeedbackStatus, FeedbackError> {
        match FeedbackStatus::parse(raw.trim()) {
            Some(status) if status.is_terminal() => Ok(status),
            _ => Err(FeedbackError::InvalidStatus(raw.to_string())),
        }
    }

    /// Fails unless `caller` is an admin.
    pub fn authorize(caller: &Caller) -> Result<(), FeedbackError> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(FeedbackError::Forbidden(
                "Only admins can moderate feedback".to_string(),
            ))
        }
    }

    /// Checks that `caller` may move an entry from `current` to `target`.
    ///
    /// Authorization is checked before the target, and the target before
    /// the current state.
    pub fn transition(
        caller: &Caller,
        current: FeedbackStatus,
        target: FeedbackStatus,
    ) -> Result<FeedbackStatus, FeedbackError> {
        Self::authorize(caller)?;

        if !target.is_terminal() {
            return Err(FeedbackError::InvalidStatus(target.to_string()));
        }

        if Self::is_valid_transition(current, target) {
            Ok(target)
        } else {
            Err(FeedbackError::InvalidTransition {
                from: current,
                to: target,
            })
        }
    }

    /// Valid transitions: pending → approved, pending → rejected.
    #[must_use]
    pub fn is_valid_transition(from: FeedbackStatus, to: FeedbackStatus) -> bool {
        matches!(
            (from, to),
            (
                FeedbackStatus::Pending,
                FeedbackStatus::Approved | FeedbackStatus::Rejected
            )
        )
    }
}
