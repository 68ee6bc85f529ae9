//! Image and classification records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::classifier::ClassificationLabel;

/// An uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image ID.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Original filename as uploaded.
    pub file_name: String,
    /// Retrieval URL.
    pub url: String,
    /// Object store key.
    pub storage_key: String,
    /// True once a classification is attached.
    pub analyzed: bool,
    /// Upload timestamp.
    pub upload_date: DateTime<Utc>,
    /// Current classification, set iff `analyzed`.
    pub classification_id: Option<Uuid>,
}

/// The stored outcome of one successful analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Classification ID.
    pub id: Uuid,
    /// Image the verdict is for.
    pub image_id: Uuid,
    /// Edibility label.
    #[serde(rename = "classification")]
    pub label: ClassificationLabel,
    /// Confidence in `[0, 1]`.
    pub confidence: Decimal,
    /// Explanation text.
    pub details: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// An image together with its current classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    /// The image.
    #[serde(flatten)]
    pub image: Image,
    /// Current classification, if analyzed.
    pub classification: Option<Classification>,
}

/// Input for recording an uploaded image.
#[derive(Debug, Clone)]
pub struct NewImage {
    /// Pre-generated image ID (also part of the storage key).
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Original filename.
    pub file_name: String,
    /// Retrieval URL.
    pub url: String,
    /// Object store key.
    pub storage_key: String,
}

/// Input for recording a classification.
#[derive(Debug, Clone)]
pub struct NewClassification {
    /// Image the verdict is for.
    pub image_id: Uuid,
    /// Edibility label.
    pub label: ClassificationLabel,
    /// Confidence in `[0, 1]`.
    pub confidence: Decimal,
    /// Explanation text.
    pub details: String,
}
