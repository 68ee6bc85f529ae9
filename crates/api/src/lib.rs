//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api`
//! - Authentication middleware
//! - Error responses
//! - Startup tasks such as admin bootstrap

pub mod bootstrap;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use mycoguard_core::analysis::{AnalysisLocks, AnalysisService, HttpImageFetcher};
use mycoguard_core::classifier::ClassifierInvoker;
use mycoguard_core::feedback::FeedbackService;
use mycoguard_core::image::ImageService;
use mycoguard_core::storage::{StorageProvider, StorageService};
use mycoguard_db::{FeedbackRepository, ImageRepository};
use mycoguard_shared::JwtService;

/// Image service bound to the database repository.
pub type Images = ImageService<ImageRepository>;
/// Feedback service bound to the database repositories.
pub type Feedback = FeedbackService<FeedbackRepository, ImageRepository>;
/// Analysis service bound to the production adapters.
pub type Analysis = AnalysisService<ImageRepository, HttpImageFetcher, ClassifierInvoker>;

/// Collaborators of the analysis pipeline that outlive a request.
pub struct AnalysisContext {
    /// Per-image advisory locks.
    pub locks: AnalysisLocks,
    /// Downloads the stored photo to a scratch file.
    pub fetcher: Arc<HttpImageFetcher>,
    /// Runs the external classifier.
    pub classifier: Arc<ClassifierInvoker>,
    /// Directory for scratch copies.
    pub scratch_dir: PathBuf,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
    /// Object store for uploaded photos.
    pub storage: Arc<StorageService>,
    /// Analysis pipeline collaborators.
    pub analysis: Arc<AnalysisContext>,
}

impl AppState {
    fn image_repo(&self) -> Arc<ImageRepository> {
        Arc::new(ImageRepository::new((*self.db).clone()))
    }

    /// Image service for this request.
    #[must_use]
    pub fn images(&self) -> Images {
        ImageService::new(Arc::clone(&self.storage), self.image_repo())
    }

    /// Feedback service for this request.
    #[must_use]
    pub fn feedback(&self) -> Feedback {
        FeedbackService::new(
            Arc::new(FeedbackRepository::new((*self.db).clone())),
            self.image_repo(),
        )
    }

    /// Analysis service for this request.
    #[must_use]
    pub fn analyzer(&self) -> Analysis {
        AnalysisService::new(
            self.image_repo(),
            Arc::clone(&self.analysis.fetcher),
            Arc::clone(&self.analysis.classifier),
            self.analysis.locks.clone(),
            self.analysis.scratch_dir.clone(),
        )
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let mut api = routes::api_routes_with_state(state.clone());

    // Local development store: serve uploaded photos directly.
    if let StorageProvider::LocalFs { root } = &state.storage.config().provider {
        api = api.nest_service("/uploads", ServeDir::new(root));
    }

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
