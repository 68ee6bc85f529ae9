//! Feedback repository for database operations.
//!
//! Read methods join the author and target image (with its current
//! classification) in three follow-up queries rather than per row.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::image::{classification_to_domain, image_to_domain};
use crate::entities::{
    classifications, feedback, images, sea_orm_active_enums::FeedbackStatus as DbStatus, users,
};
use mycoguard_core::feedback::{
    FeedbackAuthor, FeedbackEntry, FeedbackError, FeedbackFilter, FeedbackImage,
    FeedbackRepository as FeedbackRepoTrait, FeedbackStatus, NewFeedback,
};

/// Feedback repository implementation.
#[derive(Debug, Clone)]
pub struct FeedbackRepository {
    db: DatabaseConnection,
}

impl FeedbackRepository {
    /// Create a new feedback repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Attaches author and image summaries to raw rows, keeping their order.
    async fn hydrate(&self, rows: Vec<feedback::Model>) -> Result<Vec<FeedbackEntry>, DbErr> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: HashSet<Uuid> = rows.iter().map(|r| r.user_id).collect();
        let image_ids: HashSet<Uuid> = rows.iter().map(|r| r.image_id).collect();

        let authors: HashMap<Uuid, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let image_models = images::Entity::find()
            .filter(images::Column::Id.is_in(image_ids))
            .all(&self.db)
            .await?;

        let classification_ids: Vec<Uuid> = image_models
            .iter()
            .filter_map(|i| i.classification_id)
            .collect();
        let classifications: HashMap<Uuid, classifications::Model> = if classification_ids
            .is_empty()
        {
            HashMap::new()
        } else {
            classifications::Entity::find()
                .filter(classifications::Column::Id.is_in(classification_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };

        let images: HashMap<Uuid, FeedbackImage> = image_models
            .into_iter()
            .map(|model| {
                let classification = model
                    .classification_id
                    .and_then(|id| classifications.get(&id).cloned())
                    .map(classification_to_domain);
                let image = image_to_domain(model);
                (
                    image.id,
                    FeedbackImage {
                        id: image.id,
                        file_name: image.file_name,
                        url: image.url,
                        classification,
                    },
                )
            })
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let author = authors.get(&row.user_id).map(|u| FeedbackAuthor {
                    id: u.id,
                    name: u.name.clone(),
                    email: Some(u.email.clone()),
                });
                let image = images.get(&row.image_id).cloned();
                let mut entry = to_domain(row);
                entry.author = author;
                entry.image = image;
                entry
            })
            .collect())
    }
}

impl FeedbackRepoTrait for FeedbackRepository {
    async fn create(&self, input: NewFeedback) -> Result<FeedbackEntry, FeedbackError> {
        let active_model = feedback::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(input.user_id),
            image_id: Set(input.image_id),
            text: Set(input.text),
            status: Set(DbStatus::Pending),
            created_at: Set(Utc::now().into()),
        };

        let model = active_model.insert(&self.db).await.map_err(db_err)?;
        let mut entries = self.hydrate(vec![model]).await.map_err(db_err)?;
        entries
            .pop()
            .ok_or_else(|| FeedbackError::repository("inserted feedback row vanished"))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FeedbackEntry>, FeedbackError> {
        let Some(model) = feedback::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        let mut entries = self.hydrate(vec![model]).await.map_err(db_err)?;
        Ok(entries.pop())
    }

    async fn list(&self, filter: FeedbackFilter) -> Result<Vec<FeedbackEntry>, FeedbackError> {
        let mut query = feedback::Entity::find().order_by_desc(feedback::Column::CreatedAt);
        query = match filter {
            FeedbackFilter::All => query,
            FeedbackFilter::ByAuthor(user_id) => query.filter(feedback::Column::UserId.eq(user_id)),
            FeedbackFilter::ByImage(image_id) => {
                query.filter(feedback::Column::ImageId.eq(image_id))
            }
            FeedbackFilter::Approved { limit } => {
                let query = query.filter(feedback::Column::Status.eq(DbStatus::Approved));
                match limit {
                    Some(limit) => query.limit(limit),
                    None => query,
                }
            }
        };

        let rows = query.all(&self.db).await.map_err(db_err)?;
        self.hydrate(rows).await.map_err(db_err)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: FeedbackStatus,
    ) -> Result<Option<FeedbackEntry>, FeedbackError> {
        let changes = feedback::ActiveModel {
            status: Set(to_db_status(status)),
            ..Default::default()
        };

        let result = feedback::Entity::update_many()
            .set(changes)
            .filter(feedback::Column::Id.eq(id))
            .filter(feedback::Column::Status.eq(DbStatus::Pending))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, FeedbackError> {
        let result = feedback::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn db_err(e: DbErr) -> FeedbackError {
    FeedbackError::repository(e.to_string())
}

/// Convert domain status to database enum.
const fn to_db_status(status: FeedbackStatus) -> DbStatus {
    match status {
        FeedbackStatus::Pending => DbStatus::Pending,
        FeedbackStatus::Approved => DbStatus::Approved,
        FeedbackStatus::Rejected => DbStatus::Rejected,
    }
}

/// Convert database status to domain enum.
const fn from_db_status(status: DbStatus) -> FeedbackStatus {
    match status {
        DbStatus::Pending => FeedbackStatus::Pending,
        DbStatus::Approved => FeedbackStatus::Approved,
        DbStatus::Rejected => FeedbackStatus::Rejected,
    }
}

/// Convert database model to domain model without joined summaries.
fn to_domain(model: feedback::Model) -> FeedbackEntry {
    FeedbackEntry {
        id: model.id,
        user_id: model.user_id,
        image_id: model.image_id,
        text: model.text,
        status: from_db_status(model.status),
        created_at: model.created_at.into(),
        author: None,
        image: None,
    }
}
