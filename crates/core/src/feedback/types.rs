//! Feedback records and read models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::image::Classification;

/// Moderation status of a feedback entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    /// Awaiting moderation.
    #[default]
    Pending,
    /// Visible publicly.
    Approved,
    /// Hidden from the public lists.
    Rejected,
}

impl FeedbackStatus {
    /// Returns the status name as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true for states that admit no further transition.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author summary attached to feedback read models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAuthor {
    /// User ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email, only populated for admin views.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Target image summary attached to feedback read models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackImage {
    /// Image ID.
    pub id: Uuid,
    /// Original filename.
    pub file_name: String,
    /// Retrieval URL.
    pub url: String,
    /// Current classification, if analyzed.
    pub classification: Option<Classification>,
}

/// A feedback entry as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    /// Feedback ID.
    pub id: Uuid,
    /// Authoring user.
    pub user_id: Uuid,
    /// Target image.
    pub image_id: Uuid,
    /// Free text.
    pub text: String,
    /// Moderation status.
    pub status: FeedbackStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Author summary, when joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<FeedbackAuthor>,
    /// Target image summary, when joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<FeedbackImage>,
}

impl FeedbackEntry {
    /// Drops author emails for non-admin readers.
    #[must_use]
    pub fn without_author_email(mut self) -> Self {
        if let Some(author) = self.author.as_mut() {
            author.email = None;
        }
        self
    }
}

/// Input for creating feedback.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    /// Authoring user.
    pub user_id: Uuid,
    /// Target image.
    pub image_id: Uuid,
    /// Free text, already trimmed.
    pub text: String,
}

/// Which feedback entries to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackFilter {
    /// Every entry regardless of status.
    All,
    /// Entries written by one user.
    ByAuthor(Uuid),
    /// Entries on one image.
    ByImage(Uuid),
    /// Approved entries only, optionally capped.
    Approved {
        /// Maximum number of entries.
        limit: Option<u64>,
    },
}
