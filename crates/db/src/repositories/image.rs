//! Image repository for database operations.
//!
//! Images and their classifications are written together; the
//! compare-and-swap in `attach_classification` and the cascade in `delete`
//! each run in one transaction.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{
    classifications, images, sea_orm_active_enums::ClassificationLabel as DbLabel,
};
use mycoguard_core::classifier::ClassificationLabel;
use mycoguard_core::image::{
    Classification, Image, ImageDetails, ImageError, ImageRepository as ImageRepoTrait,
    NewClassification, NewImage,
};

/// Image repository implementation.
#[derive(Debug, Clone)]
pub struct ImageRepository {
    db: DatabaseConnection,
}

impl ImageRepository {
    /// Create a new image repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads classifications by ID, keyed by ID.
    async fn classifications_by_id(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Classification>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let models = classifications::Entity::find()
            .filter(classifications::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(models
            .into_iter()
            .map(|m| (m.id, classification_to_domain(m)))
            .collect())
    }
}

impl ImageRepoTrait for ImageRepository {
    async fn create(&self, input: NewImage) -> Result<Image, ImageError> {
        let active_model = images::ActiveModel {
            id: Set(input.id),
            user_id: Set(input.user_id),
            file_name: Set(input.file_name),
            url: Set(input.url),
            storage_key: Set(input.storage_key),
            analyzed: Set(false),
            classification_id: Set(None),
            upload_date: Set(Utc::now().into()),
        };

        let model = active_model.insert(&self.db).await.map_err(db_err)?;
        Ok(image_to_domain(model))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Image>, ImageError> {
        let model = images::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(image_to_domain))
    }

    async fn find_details(&self, id: Uuid) -> Result<Option<ImageDetails>, ImageError> {
        let Some(image) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let classification = match image.classification_id {
            Some(classification_id) => self.find_classification(classification_id).await?,
            None => None,
        };
        Ok(Some(ImageDetails {
            image,
            classification,
        }))
    }

    async fn list(&self, owner_id: Option<Uuid>) -> Result<Vec<ImageDetails>, ImageError> {
        let mut query = images::Entity::find().order_by_desc(images::Column::UploadDate);
        if let Some(owner_id) = owner_id {
            query = query.filter(images::Column::UserId.eq(owner_id));
        }
        let models = query.all(&self.db).await.map_err(db_err)?;

        let ids = models.iter().filter_map(|m| m.classification_id).collect();
        let mut classifications = self.classifications_by_id(ids).await.map_err(db_err)?;

        Ok(models
            .into_iter()
            .map(|model| {
                let classification = model
                    .classification_id
                    .and_then(|id| classifications.remove(&id));
                ImageDetails {
                    image: image_to_domain(model),
                    classification,
                }
            })
            .collect())
    }

    async fn find_classification(&self, id: Uuid) -> Result<Option<Classification>, ImageError> {
        let model = classifications::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(classification_to_domain))
    }

    async fn create_classification(
        &self,
        input: NewClassification,
    ) -> Result<Classification, ImageError> {
        let active_model = classifications::ActiveModel {
            id: Set(Uuid::new_v4()),
            image_id: Set(input.image_id),
            label: Set(to_db_label(input.label)),
            confidence: Set(input.confidence),
            details: Set(input.details),
            created_at: Set(Utc::now().into()),
        };

        let model = active_model.insert(&self.db).await.map_err(db_err)?;
        Ok(classification_to_domain(model))
    }

    async fn attach_classification(
        &self,
        image_id: Uuid,
        expected_previous: Option<Uuid>,
        classification_id: Uuid,
    ) -> Result<bool, ImageError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let mut update = images::Entity::update_many()
            .col_expr(
                images::Column::ClassificationId,
                Expr::value(classification_id),
            )
            .col_expr(images::Column::Analyzed, Expr::value(true))
            .filter(images::Column::Id.eq(image_id));
        update = match expected_previous {
            Some(previous) => update.filter(images::Column::ClassificationId.eq(previous)),
            None => update.filter(images::Column::ClassificationId.is_null()),
        };

        let result = update.exec(&txn).await.map_err(db_err)?;
        if result.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Ok(false);
        }

        if let Some(previous) = expected_previous {
            classifications::Entity::delete_by_id(previous)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn delete_classification(&self, id: Uuid) -> Result<bool, ImageError> {
        let result = classifications::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ImageError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Detach first so removing the classification cannot trip the
        // analyzed/classification_id check.
        images::Entity::update_many()
            .col_expr(
                images::Column::ClassificationId,
                Expr::value(Option::<Uuid>::None),
            )
            .col_expr(images::Column::Analyzed, Expr::value(false))
            .filter(images::Column::Id.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        classifications::Entity::delete_many()
            .filter(classifications::Column::ImageId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let result = images::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}

#[allow(clippy::needless_pass_by_value)]
fn db_err(e: DbErr) -> ImageError {
    ImageError::repository(e.to_string())
}

/// Convert domain label to database enum.
pub(crate) const fn to_db_label(label: ClassificationLabel) -> DbLabel {
    match label {
        ClassificationLabel::Edible => DbLabel::Edible,
        ClassificationLabel::Poisonous => DbLabel::Poisonous,
        ClassificationLabel::Deadly => DbLabel::Deadly,
        ClassificationLabel::ConditionallyEdible => DbLabel::ConditionallyEdible,
        ClassificationLabel::NotAMushroom => DbLabel::NotAMushroom,
    }
}

/// Convert database label to domain enum.
const fn from_db_label(label: DbLabel) -> ClassificationLabel {
    match label {
        DbLabel::Edible => ClassificationLabel::Edible,
        DbLabel::Poisonous => ClassificationLabel::Poisonous,
        DbLabel::Deadly => ClassificationLabel::Deadly,
        DbLabel::ConditionallyEdible => ClassificationLabel::ConditionallyEdible,
        DbLabel::NotAMushroom => ClassificationLabel::NotAMushroom,
    }
}

/// Convert database model to domain model.
pub(crate) fn image_to_domain(model: images::Model) -> Image {
    Image {
        id: model.id,
        user_id: model.user_id,
        file_name: model.file_name,
        url: model.url,
        storage_key: model.storage_key,
        analyzed: model.analyzed,
        upload_date: model.upload_date.into(),
        classification_id: model.classification_id,
    }
}

/// Convert database model to domain model.
pub(crate) fn classification_to_domain(model: classifications::Model) -> Classification {
    Classification {
        id: model.id,
        image_id: model.image_id,
        label: from_db_label(model.label),
        confidence: model.confidence,
        details: model.details,
        created_at: model.created_at.into(),
    }
}
