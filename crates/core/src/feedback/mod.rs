//! Community feedback on identifications.
//!
//! Feedback starts `pending` and is moderated by admins into one of two
//! terminal states. See [`Moderation`] for the transition rules.

mod error;
mod moderation;
mod service;
mod types;

pub use error::FeedbackError;
pub use moderation::Moderation;
pub use service::{FeedbackRepository, FeedbackService, RECENT_FEEDBACK_LIMIT};
pub use types::{
    FeedbackAuthor, FeedbackEntry, FeedbackFilter, FeedbackImage, FeedbackStatus, NewFeedback,
};
