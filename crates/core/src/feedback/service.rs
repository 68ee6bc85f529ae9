//! Feedback service implementation.

use std::future::Future;
use std::sync::Arc;

use uuid::Uuid;

use super::error::FeedbackError;
use super::moderation::Moderation;
use super::types::{FeedbackEntry, FeedbackFilter, FeedbackStatus, NewFeedback};
use crate::auth::Caller;
use crate::image::ImageRepository;

/// Number of entries on the landing page.
pub const RECENT_FEEDBACK_LIMIT: u64 = 6;

/// Repository trait for feedback persistence.
///
/// Read methods return entries with author and image summaries joined in,
/// newest first.
pub trait FeedbackRepository: Send + Sync {
    /// Insert a pending entry.
    fn create(
        &self,
        input: NewFeedback,
    ) -> impl Future<Output = Result<FeedbackEntry, FeedbackError>> + Send;

    /// Find an entry by ID.
    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<FeedbackEntry>, FeedbackError>> + Send;

    /// List entries matching `filter`.
    fn list(
        &self,
        filter: FeedbackFilter,
    ) -> impl Future<Output = Result<Vec<FeedbackEntry>, FeedbackError>> + Send;

    /// Set the status of a pending entry.
    ///
    /// Returns `None` if the entry does not exist or is no longer pending.
    fn update_status(
        &self,
        id: Uuid,
        status: FeedbackStatus,
    ) -> impl Future<Output = Result<Option<FeedbackEntry>, FeedbackError>> + Send;

    /// Delete an entry.
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<bool, FeedbackError>> + Send;
}

/// Feedback service for submission, reads, and moderation.
pub struct FeedbackService<R: FeedbackRepository, I: ImageRepository> {
    repo: Arc<R>,
    images: Arc<I>,
}

impl<R: FeedbackRepository, I: ImageRepository> FeedbackService<R, I> {
    /// Create a new feedback service.
    #[must_use]
    pub fn new(repo: Arc<R>, images: Arc<I>) -> Self {
        Self { repo, images }
    }

    /// Submit feedback on an image the caller can view.
    pub async fn submit(
        &self,
        caller: &Caller,
        image_id: Uuid,
        text: &str,
    ) -> Result<FeedbackEntry, FeedbackError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FeedbackError::EmptyText);
        }

        self.authorize_image(caller, image_id).await?;

        let entry = self
            .repo
            .create(NewFeedback {
                user_id: caller.user_id,
                image_id,
                text: text.to_string(),
            })
            .await?;

        tracing::info!(feedback_id = %entry.id, image_id = %image_id, user_id = %caller.user_id, "feedback submitted");
        Ok(entry)
    }

    /// All entries in every state. Admin only.
    pub async fn list_all(&self, caller: &Caller) -> Result<Vec<FeedbackEntry>, FeedbackError> {
        Moderation::authorize(caller)?;
        self.repo.list(FeedbackFilter::All).await
    }

    /// Entries written by the caller.
    pub async fn mine(&self, caller: &Caller) -> Result<Vec<FeedbackEntry>, FeedbackError> {
        let entries = self.repo.list(FeedbackFilter::ByAuthor(caller.user_id)).await?;
        Ok(present(caller, entries))
    }

    /// Entries on one image, for callers who can view it.
    pub async fn for_image(
        &self,
        caller: &Caller,
        image_id: Uuid,
    ) -> Result<Vec<FeedbackEntry>, FeedbackError> {
        self.authorize_image(caller, image_id).await?;
        let entries = self.repo.list(FeedbackFilter::ByImage(image_id)).await?;
        Ok(present(caller, entries))
    }

    /// Moderate a pending entry.
    ///
    /// `status` is the raw requested value; anything but `approved` or
    /// `rejected` is a validation error. Losing a race with another
    /// moderator yields `InvalidTransition`.
    pub async fn update_status(
        &self,
        caller: &Caller,
        id: Uuid,
        status: &str,
    ) -> Result<FeedbackEntry, FeedbackError> {
        Moderation::authorize(caller)?;
        let target = Moderation::parse_target(status)?;

        let entry = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(FeedbackError::NotFound(id))?;
        Moderation::transition(caller, entry.status, target)?;

        if let Some(updated) = self.repo.update_status(id, target).await? {
            tracing::info!(feedback_id = %id, status = %target, moderator = %caller.user_id, "feedback moderated");
            return Ok(updated);
        }

        // Someone else moderated it between the read and the update.
        let current = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(FeedbackError::NotFound(id))?;
        Err(FeedbackError::InvalidTransition {
            from: current.status,
            to: target,
        })
    }

    /// Delete an entry. Author or admin.
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), FeedbackError> {
        let entry = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(FeedbackError::NotFound(id))?;

        if !caller.can_access(entry.user_id) {
            return Err(FeedbackError::Forbidden(
                "Not authorized to delete this feedback".to_string(),
            ));
        }

        if !self.repo.delete(id).await? {
            return Err(FeedbackError::NotFound(id));
        }

        tracing::info!(feedback_id = %id, user_id = %caller.user_id, "feedback deleted");
        Ok(())
    }

    /// Every approved entry, newest first.
    pub async fn public(&self) -> Result<Vec<FeedbackEntry>, FeedbackError> {
        let entries = self
            .repo
            .list(FeedbackFilter::Approved { limit: None })
            .await?;
        Ok(redact(entries))
    }

    /// The latest approved entries.
    pub async fn recent(&self) -> Result<Vec<FeedbackEntry>, FeedbackError> {
        let entries = self
            .repo
            .list(FeedbackFilter::Approved {
                limit: Some(RECENT_FEEDBACK_LIMIT),
            })
            .await?;
        Ok(redact(entries))
    }

    async fn authorize_image(&self, caller: &Caller, image_id: Uuid) -> Result<(), FeedbackError> {
        let image = self
            .images
            .find_by_id(image_id)
            .await?
            .ok_or(FeedbackError::ImageNotFound(image_id))?;

        if caller.can_access(image.user_id) {
            Ok(())
        } else {
            Err(FeedbackError::Forbidden(
                "Not authorized to access this image".to_string(),
            ))
        }
    }
}

fn present(caller: &Caller, entries: Vec<FeedbackEntry>) -> Vec<FeedbackEntry> {
    if caller.is_admin() {
        entries
    } else {
        redact(entries)
    }
}

fn redact(entries: Vec<FeedbackEntry>) -> Vec<FeedbackEntry> {
    entries
        .into_iter()
        .map(FeedbackEntry::without_author_email)
        .collect()
}
