//! Core domain logic for MycoGuard.
//!
//! This crate has no web or database dependencies. Persistence is reached
//! through repository traits implemented in `mycoguard-db`.
//!
//! # Modules
//!
//! - `auth` - Password hashing, roles, and ownership guards
//! - `storage` - Object store adapter for uploaded photos
//! - `classifier` - External classifier process and verdict parsing
//! - `image` - Image and classification records
//! - `analysis` - Download, classify, and persist one image
//! - `feedback` - Community feedback and moderation

pub mod analysis;
pub mod auth;
pub mod classifier;
pub mod feedback;
pub mod image;
pub mod storage;

#[cfg(test)]
mod test_support;
