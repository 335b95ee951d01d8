use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

// Re-export shared types from ftpcdn-types
pub use ftpcdn_types::*;

pub mod config;
pub mod coordinator;
pub mod database;
pub mod error;
pub mod handlers;
pub mod naming;
pub mod registry;
pub mod remote;

#[cfg(test)]
mod testing;

use config::Config;
use coordinator::BlobCoordinator;
use database::setup_database;
use error::{AppError, Result};
use registry::CdnPrefixRegistry;
use remote::FtpRemoteStore;

// Room for multipart framing and the text fields around the file
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub coordinator: BlobCoordinator,
    pub registry: CdnPrefixRegistry,
}

pub async fn run_server() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    // Setup database
    let db = setup_database(&config.database_url).await?;

    // Remote store is contacted per operation, nothing to open here
    let remote = Arc::new(FtpRemoteStore::new(config.ftp.clone()));

    let server_address = config.server_address.clone();
    tracing::info!(
        "📡 FTP store: {} (base path {})",
        config.ftp.address(),
        config.ftp.base_path
    );

    // Create application state
    let state = AppState {
        coordinator: BlobCoordinator::new(db.clone(), remote),
        registry: CdnPrefixRegistry::new(db),
        config,
    };

    // Build the application router
    let app = create_app(state);

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(&server_address)
        .await
        .map_err(|e| {
            AppError::ServerError(format!("Failed to bind to {}: {}", server_address, e))
        })?;

    tracing::info!("🚀 FTP CDN backend server starting on {}", server_address);

    // Start the server
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::ServerError(format!("Server error: {}", e)))?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let upload_limit = state.config.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        // File operations
        .route(
            "/api/upload",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/files", get(handlers::list_files))
        .route(
            "/api/files/:id",
            get(handlers::get_file_info).delete(handlers::delete_file),
        )
        .route(
            "/api/files/:id/description",
            put(handlers::update_file_description),
        )
        .route("/api/files/:id/download", get(handlers::download_file))
        // CDN prefix registry
        .route(
            "/api/cdn-prefixes",
            get(handlers::list_cdn_prefixes).post(handlers::add_cdn_prefix),
        )
        .route(
            "/api/cdn-prefixes/active",
            get(handlers::list_active_cdn_prefixes),
        )
        .route(
            "/api/cdn-prefixes/default",
            get(handlers::get_default_cdn_prefix),
        )
        .route(
            "/api/cdn-prefixes/:id",
            get(handlers::get_cdn_prefix)
                .put(handlers::update_cdn_prefix)
                .delete(handlers::delete_cdn_prefix),
        )
        .route(
            "/api/cdn-prefixes/:id/default",
            post(handlers::set_default_cdn_prefix),
        )
        // Health check
        .route("/health", get(handlers::health_check))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
