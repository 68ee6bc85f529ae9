//! Object store adapter for uploaded photos, built on Apache OpenDAL.
//!
//! Supported backends:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3
//! - Azure Blob Storage
//! - Local filesystem (development only)
//!
//! Objects are written under `images/{owner_id}/{image_id}/{filename}` and
//! retrieved through `public_base_url` joined with that key.

mod config;
mod error;
mod service;

pub use config::StorageConfig;
pub use error::StorageError;
pub use mycoguard_shared::config::StorageProvider;
pub use service::{StorageService, StoredObject};
