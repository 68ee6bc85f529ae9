//! Storage service implementation using Apache OpenDAL.

use bytes::Bytes;
use opendal::{ErrorKind, Operator, services};
use uuid::Uuid;

use super::config::StorageConfig;
use super::error::StorageError;
use mycoguard_shared::config::StorageProvider;

/// An object written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Storage key (the object-store content id).
    pub key: String,
    /// Retrieval URL.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
}

/// Storage service for uploaded photos.
pub struct StorageService {
    operator: Operator,
    config: StorageConfig,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("provider", &self.config.provider.name())
            .field("public_base_url", &self.config.public_base_url)
            .finish_non_exhaustive()
    }
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        Ok(Self { operator, config })
    }

    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => Operator::new(
                services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region),
            )
            .map(opendal::OperatorBuilder::finish),
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => Operator::new(
                services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container),
            )
            .map(opendal::OperatorBuilder::finish),
            StorageProvider::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("invalid path"))?;
                Operator::new(services::Fs::default().root(root))
                    .map(opendal::OperatorBuilder::finish)
            }
        };

        operator.map_err(|e| StorageError::configuration(e.to_string()))
    }

    /// Validate an upload against size and MIME constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if file size or MIME type is invalid.
    pub fn validate_upload(&self, content_type: &str, size: u64) -> Result<(), StorageError> {
        if size > self.config.max_file_size {
            return Err(StorageError::file_too_large(
                size,
                self.config.max_file_size,
            ));
        }

        if !self.config.is_mime_type_allowed(content_type) {
            return Err(StorageError::invalid_mime_type(content_type));
        }

        Ok(())
    }

    /// Storage key for an image: `images/{owner_id}/{image_id}/{sanitized_filename}`.
    #[must_use]
    pub fn storage_key(owner_id: Uuid, image_id: Uuid, filename: &str) -> String {
        format!(
            "images/{owner_id}/{image_id}/{}",
            sanitize_filename(filename)
        )
    }

    /// Retrieval URL for a storage key.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }

    /// Validate and write an object.
    ///
    /// # Errors
    ///
    /// Returns a validation error for disallowed content, or an operation
    /// error if the write fails.
    pub async fn upload(
        &self,
        key: &str,
        content_type: &str,
        content: Bytes,
    ) -> Result<StoredObject, StorageError> {
        let size = content.len() as u64;
        self.validate_upload(content_type, size)?;

        self.operator
            .write_with(key, content)
            .content_type(content_type)
            .await?;

        tracing::debug!(key, size, provider = self.config.provider.name(), "object stored");

        Ok(StoredObject {
            key: key.to_string(),
            url: self.public_url(key),
            size,
        })
    }

    /// Delete an object. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.operator.delete(key).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if an object exists in storage.
    pub async fn exists(&self, key: &str) -> bool {
        self.operator.stat(key).await.is_ok()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // A bare ".." would escape the image directory on filesystem backends.
    if sanitized.chars().all(|c| c == '.') {
        format!("upload{sanitized}").replace('.', "_")
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycoguard_shared::config::StorageProvider;

    fn local_service(root: &std::path::Path) -> StorageService {
        let config = StorageConfig::new(
            StorageProvider::local_fs(root),
            "http://localhost:5000/uploads/",
        )
        .with_max_file_size(1024);
        StorageService::from_config(config).expect("should create service")
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("chanterelle.jpg"), "chanterelle.jpg");
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("きのこ.jpg"), "___.jpg");
        assert_eq!(sanitize_filename(".."), "upload__");
    }

    #[test]
    fn test_storage_key_layout() {
        let owner = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").expect("valid uuid");
        let image = Uuid::parse_str("6ba7b811-9dad-11d1-80b4-00c04fd430c8").expect("valid uuid");

        assert_eq!(
            StorageService::storage_key(owner, image, "cap and gills.jpg"),
            format!("images/{owner}/{image}/cap_and_gills.jpg")
        );
    }

    #[test]
    fn test_public_url_joins_without_double_slash() {
        let dir = tempfile::tempdir().unwrap();
        let service = local_service(dir.path());

        assert_eq!(
            service.public_url("images/a/b/c.jpg"),
            "http://localhost:5000/uploads/images/a/b/c.jpg"
        );
    }

    #[test]
    fn test_validate_upload() {
        let dir = tempfile::tempdir().unwrap();
        let service = local_service(dir.path());

        assert!(service.validate_upload("image/jpeg", 512).is_ok());
        assert!(matches!(
            service.validate_upload("image/jpeg", 2048),
            Err(StorageError::FileTooLarge { .. })
        ));
        assert!(matches!(
            service.validate_upload("application/pdf", 10),
            Err(StorageError::InvalidMimeType { .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_then_delete_local_object() {
        let dir = tempfile::tempdir().unwrap();
        let service = local_service(dir.path());
        let key = StorageService::storage_key(Uuid::new_v4(), Uuid::new_v4(), "morel.jpg");

        let stored = service
            .upload(&key, "image/jpeg", Bytes::from_static(b"\xff\xd8\xff"))
            .await
            .unwrap();

        assert_eq!(stored.size, 3);
        assert!(stored.url.ends_with(&key));
        assert!(service.exists(&key).await);
        assert!(dir.path().join(&key).exists());

        service.delete(&key).await.unwrap();
        assert!(!service.exists(&key).await);

        // Second delete is a no-op.
        service.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_upload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = local_service(dir.path());

        let result = service
            .upload("images/x/y/evil.html", "text/html", Bytes::from_static(b"<p>"))
            .await;

        assert!(matches!(result, Err(StorageError::InvalidMimeType { .. })));
        assert!(!service.exists("images/x/y/evil.html").await);
    }
}
