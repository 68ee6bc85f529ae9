//! Shared types, errors, and configuration for MycoGuard.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Configuration management
//! - JWT token handling and auth payloads

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;

pub use config::AppConfig;
pub use error::{AppError, AppResult, Diagnostic, FieldError};
pub use jwt::{JwtConfig, JwtError, JwtService};
