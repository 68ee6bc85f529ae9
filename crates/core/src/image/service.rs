//! Image service implementation.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

use super::error::ImageError;
use super::types::{Classification, Image, ImageDetails, NewClassification, NewImage};
use crate::auth::Caller;
use crate::storage::StorageService;

/// Repository trait for image and classification persistence.
///
/// Images and their classifications form one aggregate: the repository keeps
/// `analyzed` and `classification_id` consistent and deletes classifications
/// together with their image.
pub trait ImageRepository: Send + Sync {
    /// Create a new image record (not analyzed).
    fn create(&self, input: NewImage) -> impl Future<Output = Result<Image, ImageError>> + Send;

    /// Find image by ID.
    fn find_by_id(&self, id: Uuid) -> impl Future<Output = Result<Option<Image>, ImageError>> + Send;

    /// Find image by ID together with its classification.
    fn find_details(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<ImageDetails>, ImageError>> + Send;

    /// List images newest first, optionally restricted to one owner.
    fn list(
        &self,
        owner_id: Option<Uuid>,
    ) -> impl Future<Output = Result<Vec<ImageDetails>, ImageError>> + Send;

    /// Find a classification by ID.
    fn find_classification(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Classification>, ImageError>> + Send;

    /// Insert a classification. The image is not modified.
    fn create_classification(
        &self,
        input: NewClassification,
    ) -> impl Future<Output = Result<Classification, ImageError>> + Send;

    /// Point the image at `classification_id` and mark it analyzed, but only
    /// if its current classification is still `expected_previous`.
    ///
    /// On success the previous classification, if any, is deleted in the same
    /// transaction. Returns `false` when the image changed underneath.
    fn attach_classification(
        &self,
        image_id: Uuid,
        expected_previous: Option<Uuid>,
        classification_id: Uuid,
    ) -> impl Future<Output = Result<bool, ImageError>> + Send;

    /// Delete a classification that no image references.
    fn delete_classification(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<bool, ImageError>> + Send;

    /// Delete an image and its classifications in one transaction.
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<bool, ImageError>> + Send;
}

/// Image service for uploads, reads, and deletes.
pub struct ImageService<R: ImageRepository> {
    storage: Arc<StorageService>,
    repo: Arc<R>,
}

impl<R: ImageRepository> ImageService<R> {
    /// Create a new image service.
    #[must_use]
    pub fn new(storage: Arc<StorageService>, repo: Arc<R>) -> Self {
        Self { storage, repo }
    }

    /// Store an uploaded photo and record it for the caller.
    ///
    /// If the record cannot be written the stored object is removed again.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is rejected, the store write fails, or
    /// the database write fails.
    pub async fn upload(
        &self,
        caller: &Caller,
        file_name: &str,
        content_type: &str,
        content: Bytes,
    ) -> Result<Image, ImageError> {
        let id = Uuid::new_v4();
        let key = StorageService::storage_key(caller.user_id, id, file_name);

        let stored = self.storage.upload(&key, content_type, content).await?;

        let input = NewImage {
            id,
            user_id: caller.user_id,
            file_name: file_name.to_string(),
            url: stored.url,
            storage_key: stored.key,
        };

        match self.repo.create(input).await {
            Ok(image) => {
                tracing::info!(image_id = %image.id, user_id = %caller.user_id, size = stored.size, "image uploaded");
                Ok(image)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    tracing::warn!(key, error = %cleanup, "failed to remove object after failed insert");
                }
                Err(e)
            }
        }
    }

    /// List the caller's images, or every image for admins.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub async fn list(&self, caller: &Caller) -> Result<Vec<ImageDetails>, ImageError> {
        let owner = if caller.is_admin() {
            None
        } else {
            Some(caller.user_id)
        };
        self.repo.list(owner).await
    }

    /// Get one image with its classification.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden` per the ownership guard.
    pub async fn get(&self, id: Uuid, caller: &Caller) -> Result<ImageDetails, ImageError> {
        let details = self
            .repo
            .find_details(id)
            .await?
            .ok_or(ImageError::NotFound(id))?;

        if !caller.can_access(details.image.user_id) {
            return Err(ImageError::Forbidden(id));
        }

        Ok(details)
    }

    /// Delete an image, its stored object, and its classification.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden` per the ownership guard, or an error
    /// if the store or database delete fails.
    pub async fn delete(&self, id: Uuid, caller: &Caller) -> Result<(), ImageError> {
        let image = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(ImageError::NotFound(id))?;

        if !caller.can_access(image.user_id) {
            return Err(ImageError::Forbidden(id));
        }

        self.remove(&image).await
    }

    /// Delete every image owned by `owner_id`. Used when removing a user.
    ///
    /// # Errors
    ///
    /// Stops at the first failing delete.
    pub async fn delete_all_for_owner(&self, owner_id: Uuid) -> Result<usize, ImageError> {
        let images = self.repo.list(Some(owner_id)).await?;
        let count = images.len();

        for details in images {
            self.remove(&details.image).await?;
        }

        Ok(count)
    }

    async fn remove(&self, image: &Image) -> Result<(), ImageError> {
        // Store first: a failure here leaves the record in place for a retry.
        self.storage.delete(&image.storage_key).await?;
        self.repo.delete(image.id).await?;

        tracing::info!(image_id = %image.id, "image deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;
    use crate::classifier::ClassificationLabel;
    use crate::storage::{StorageConfig, StorageProvider};
    use crate::test_support::InMemoryImageRepository;
    use rust_decimal_macros::dec;

    fn service(dir: &std::path::Path) -> (ImageService<InMemoryImageRepository>, Arc<InMemoryImageRepository>) {
        let config = StorageConfig::new(StorageProvider::local_fs(dir), "http://localhost:5000/uploads");
        let storage = Arc::new(StorageService::from_config(config).unwrap());
        let repo = Arc::new(InMemoryImageRepository::default());
        (ImageService::new(storage, Arc::clone(&repo)), repo)
    }

    fn user() -> Caller {
        Caller::new(Uuid::new_v4(), UserRole::User)
    }

    fn admin() -> Caller {
        Caller::new(Uuid::new_v4(), UserRole::Admin)
    }

    #[tokio::test]
    async fn test_upload_stores_object_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());
        let owner = user();

        let image = service
            .upload(&owner, "cap.jpg", "image/jpeg", Bytes::from_static(b"jpeg"))
            .await
            .unwrap();

        assert_eq!(image.user_id, owner.user_id);
        assert!(!image.analyzed);
        assert!(image.classification_id.is_none());
        assert!(image.url.ends_with(&image.storage_key));
        assert!(dir.path().join(&image.storage_key).exists());
    }

    #[tokio::test]
    async fn test_upload_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let (service, repo) = service(dir.path());

        let result = service
            .upload(&user(), "notes.pdf", "application/pdf", Bytes::from_static(b"%PDF"))
            .await;

        assert!(matches!(result, Err(ImageError::Storage(_))));
        assert_eq!(repo.image_count(), 0);
    }

    #[tokio::test]
    async fn test_list_scopes_by_role() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());
        let alice = user();
        let bob = user();

        for caller in [&alice, &alice, &bob] {
            service
                .upload(caller, "a.jpg", "image/jpeg", Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        assert_eq!(service.list(&alice).await.unwrap().len(), 2);
        assert_eq!(service.list(&bob).await.unwrap().len(), 1);
        assert_eq!(service.list(&admin()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_get_enforces_ownership() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path());
        let owner = user();
        let image = service
            .upload(&owner, "a.jpg", "image/jpeg", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(service.get(image.id, &owner).await.is_ok());
        assert!(service.get(image.id, &admin()).await.is_ok());
        assert!(matches!(
            service.get(image.id, &user()).await,
            Err(ImageError::Forbidden(_))
        ));
        assert!(matches!(
            service.get(Uuid::new_v4(), &owner).await,
            Err(ImageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_object_and_classification() {
        let dir = tempfile::tempdir().unwrap();
        let (service, repo) = service(dir.path());
        let owner = user();
        let image = service
            .upload(&owner, "a.jpg", "image/jpeg", Bytes::from_static(b"x"))
            .await
            .unwrap();

        let classification = repo
            .create_classification(NewClassification {
                image_id: image.id,
                label: ClassificationLabel::Poisonous,
                confidence: dec!(0.7),
                details: "Do not consume.".to_string(),
            })
            .await
            .unwrap();
        assert!(
            repo.attach_classification(image.id, None, classification.id)
                .await
                .unwrap()
        );

        service.delete(image.id, &owner).await.unwrap();

        assert!(repo.find_by_id(image.id).await.unwrap().is_none());
        assert!(
            repo.find_classification(classification.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!dir.path().join(&image.storage_key).exists());
    }

    #[tokio::test]
    async fn test_delete_by_stranger_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let (service, repo) = service(dir.path());
        let image = service
            .upload(&user(), "a.jpg", "image/jpeg", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(matches!(
            service.delete(image.id, &user()).await,
            Err(ImageError::Forbidden(_))
        ));
        assert_eq!(repo.image_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_for_owner() {
        let dir = tempfile::tempdir().unwrap();
        let (service, repo) = service(dir.path());
        let alice = user();
        let bob = user();
        for caller in [&alice, &alice, &bob] {
            service
                .upload(caller, "a.jpg", "image/jpeg", Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        assert_eq!(service.delete_all_for_owner(alice.user_id).await.unwrap(), 2);
        assert_eq!(repo.image_count(), 1);
    }
}
