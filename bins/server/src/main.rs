//! MycoGuard API Server
//!
//! Main entry point for the MycoGuard backend service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mycoguard_api::{AnalysisContext, AppState, bootstrap, create_router};
use mycoguard_core::analysis::{AnalysisLocks, HttpImageFetcher};
use mycoguard_core::classifier::ClassifierInvoker;
use mycoguard_core::storage::{StorageConfig, StorageService};
use mycoguard_db::connect;
use mycoguard_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mycoguard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .context("Failed to connect to database")?;
    info!("Connected to database");

    if bootstrap::ensure_admin(&db, &config.admin)
        .await
        .context("Admin bootstrap failed")?
    {
        info!("Administrator account bootstrapped");
    }

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let storage = StorageService::from_config(StorageConfig::from(&config.storage))
        .context("Failed to initialize storage")?;
    info!(
        provider = config.storage.provider.name(),
        max_file_size = config.storage.max_file_size,
        "Storage configured"
    );

    tokio::fs::create_dir_all(&config.classifier.scratch_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create scratch directory {}",
                config.classifier.scratch_dir.display()
            )
        })?;

    let fetcher = HttpImageFetcher::new(
        Duration::from_secs(config.classifier.download_timeout_secs),
        config.storage.max_file_size,
    )
    .context("Failed to build HTTP client")?;
    let classifier = ClassifierInvoker::from_config(&config.classifier);
    info!(
        program = %config.classifier.program,
        timeout_secs = config.classifier.timeout_secs,
        scratch_dir = %config.classifier.scratch_dir.display(),
        "Classifier configured"
    );

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        storage: Arc::new(storage),
        analysis: Arc::new(AnalysisContext {
            locks: AnalysisLocks::new(),
            fetcher: Arc::new(fetcher),
            classifier: Arc::new(classifier),
            scratch_dir: config.classifier.scratch_dir.clone(),
        }),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
