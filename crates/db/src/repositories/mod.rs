//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod feedback;
pub mod image;
pub mod user;

pub use feedback::FeedbackRepository;
pub use image::ImageRepository;
pub use user::{UserChanges, UserRepository, from_db_role};
