//! In-memory repositories shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::feedback::{
    FeedbackEntry, FeedbackError, FeedbackFilter, FeedbackRepository, FeedbackStatus, NewFeedback,
};
use crate::image::{
    Classification, Image, ImageDetails, ImageError, ImageRepository, NewClassification, NewImage,
};

#[derive(Default)]
struct ImageTables {
    images: HashMap<Uuid, Image>,
    classifications: HashMap<Uuid, Classification>,
}

/// Mock image repository.
#[derive(Default)]
pub struct InMemoryImageRepository {
    tables: Mutex<ImageTables>,
}

impl InMemoryImageRepository {
    pub fn image_count(&self) -> usize {
        self.tables.lock().unwrap().images.len()
    }

    pub fn classifications_for(&self, image_id: Uuid) -> Vec<Classification> {
        self.tables
            .lock()
            .unwrap()
            .classifications
            .values()
            .filter(|c| c.image_id == image_id)
            .cloned()
            .collect()
    }

    /// Inserts an image directly, bypassing storage.
    pub fn insert_image(&self, user_id: Uuid, url: &str) -> Image {
        let image = Image {
            id: Uuid::new_v4(),
            user_id,
            file_name: "photo.jpg".to_string(),
            url: url.to_string(),
            storage_key: format!("images/{user_id}/photo.jpg"),
            analyzed: false,
            upload_date: Utc::now(),
            classification_id: None,
        };
        self.tables
            .lock()
            .unwrap()
            .images
            .insert(image.id, image.clone());
        image
    }

    /// Attaches a fresh classification outside any service, as a concurrent
    /// writer would.
    pub fn force_attach(&self, image_id: Uuid) -> Uuid {
        let mut tables = self.tables.lock().unwrap();
        let classification = Classification {
            id: Uuid::new_v4(),
            image_id,
            label: crate::classifier::ClassificationLabel::Deadly,
            confidence: rust_decimal::Decimal::ONE,
            details: "concurrent".to_string(),
            created_at: Utc::now(),
        };
        let id = classification.id;
        tables.classifications.insert(id, classification);
        if let Some(image) = tables.images.get_mut(&image_id) {
            image.classification_id = Some(id);
            image.analyzed = true;
        }
        id
    }

    fn details(tables: &ImageTables, image: &Image) -> ImageDetails {
        ImageDetails {
            image: image.clone(),
            classification: image
                .classification_id
                .and_then(|id| tables.classifications.get(&id).cloned()),
        }
    }
}

impl ImageRepository for InMemoryImageRepository {
    async fn create(&self, input: NewImage) -> Result<Image, ImageError> {
        let image = Image {
            id: input.id,
            user_id: input.user_id,
            file_name: input.file_name,
            url: input.url,
            storage_key: input.storage_key,
            analyzed: false,
            upload_date: Utc::now(),
            classification_id: None,
        };
        self.tables
            .lock()
            .unwrap()
            .images
            .insert(image.id, image.clone());
        Ok(image)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Image>, ImageError> {
        Ok(self.tables.lock().unwrap().images.get(&id).cloned())
    }

    async fn find_details(&self, id: Uuid) -> Result<Option<ImageDetails>, ImageError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .images
            .get(&id)
            .map(|image| Self::details(&tables, image)))
    }

    async fn list(&self, owner_id: Option<Uuid>) -> Result<Vec<ImageDetails>, ImageError> {
        let tables = self.tables.lock().unwrap();
        let mut images: Vec<ImageDetails> = tables
            .images
            .values()
            .filter(|image| owner_id.is_none_or(|owner| image.user_id == owner))
            .map(|image| Self::details(&tables, image))
            .collect();
        images.sort_by(|a, b| b.image.upload_date.cmp(&a.image.upload_date));
        Ok(images)
    }

    async fn find_classification(&self, id: Uuid) -> Result<Option<Classification>, ImageError> {
        Ok(self.tables.lock().unwrap().classifications.get(&id).cloned())
    }

    async fn create_classification(
        &self,
        input: NewClassification,
    ) -> Result<Classification, ImageError> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.images.contains_key(&input.image_id) {
            return Err(ImageError::repository("foreign key violation"));
        }
        let classification = Classification {
            id: Uuid::new_v4(),
            image_id: input.image_id,
            label: input.label,
            confidence: input.confidence,
            details: input.details,
            created_at: Utc::now(),
        };
        tables
            .classifications
            .insert(classification.id, classification.clone());
        Ok(classification)
    }

    async fn attach_classification(
        &self,
        image_id: Uuid,
        expected_previous: Option<Uuid>,
        classification_id: Uuid,
    ) -> Result<bool, ImageError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(image) = tables.images.get_mut(&image_id) else {
            return Ok(false);
        };
        if image.classification_id != expected_previous {
            return Ok(false);
        }
        image.classification_id = Some(classification_id);
        image.analyzed = true;
        if let Some(previous) = expected_previous {
            tables.classifications.remove(&previous);
        }
        Ok(true)
    }

    async fn delete_classification(&self, id: Uuid) -> Result<bool, ImageError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .classifications
            .remove(&id)
            .is_some())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ImageError> {
        let mut tables = self.tables.lock().unwrap();
        tables.classifications.retain(|_, c| c.image_id != id);
        Ok(tables.images.remove(&id).is_some())
    }
}

/// Mock feedback repository.
#[derive(Default)]
pub struct InMemoryFeedbackRepository {
    entries: Mutex<Vec<FeedbackEntry>>,
}

impl InMemoryFeedbackRepository {
    pub fn status_of(&self, id: Uuid) -> Option<FeedbackStatus> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.status)
    }
}

impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn create(&self, input: NewFeedback) -> Result<FeedbackEntry, FeedbackError> {
        let entry = FeedbackEntry {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            image_id: input.image_id,
            text: input.text,
            status: FeedbackStatus::Pending,
            created_at: Utc::now(),
            author: None,
            image: None,
        };
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<FeedbackEntry>, FeedbackError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .cloned())
    }

    async fn list(&self, filter: FeedbackFilter) -> Result<Vec<FeedbackEntry>, FeedbackError> {
        let entries = self.entries.lock().unwrap();
        let mut matching: Vec<FeedbackEntry> = entries
            .iter()
            .filter(|f| match filter {
                FeedbackFilter::All => true,
                FeedbackFilter::ByAuthor(user_id) => f.user_id == user_id,
                FeedbackFilter::ByImage(image_id) => f.image_id == image_id,
                FeedbackFilter::Approved { .. } => f.status == FeedbackStatus::Approved,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let FeedbackFilter::Approved { limit: Some(limit) } = filter {
            matching.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(matching)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: FeedbackStatus,
    ) -> Result<Option<FeedbackEntry>, FeedbackError> {
        let mut entries = self.entries.lock().unwrap();
        Ok(entries
            .iter_mut()
            .find(|f| f.id == id && f.status == FeedbackStatus::Pending)
            .map(|f| {
                f.status = status;
                f.clone()
            }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, FeedbackError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|f| f.id != id);
        Ok(entries.len() != before)
    }
}
