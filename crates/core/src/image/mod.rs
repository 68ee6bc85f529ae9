//! Uploaded photos and their classifications.
//!
//! This module provides:
//! - Image and classification records
//! - The persistence trait implemented by the db crate
//! - Upload, listing, lookup, and cascading delete

mod error;
mod service;
mod types;

pub use error::ImageError;
pub use service::{ImageRepository, ImageService};
pub use types::{Classification, Image, ImageDetails, NewClassification, NewImage};
