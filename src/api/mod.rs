//! REST API server module
//!
//! Serves the same-origin download proxy and the paged bulk listing that the
//! bulk exporter consumes, plus uploads and deletes, over an axum router.

use crate::storage::StorageClient;
use crate::{Config, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::{AppState, StaticCatalog, SubmissionCatalog};

/// Multipart framing allowance on top of the largest accepted file
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Objects
/// - `GET /download/*key` - Same-origin download proxy (404 when missing)
/// - `POST /upload?category=` - Upload a multipart `file` field
/// - `DELETE /objects/*key?fileId=` - Delete an object
///
/// ## Bulk export
/// - `GET /bulk-download?batch=&batchSize=` - One page of the files to export
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(
    storage: StorageClient,
    catalog: Arc<dyn SubmissionCatalog>,
    config: Arc<Config>,
) -> Router {
    let body_limit = config
        .storage
        .upload_limit()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let router = Router::new()
        // Objects
        .route("/download/*key", get(routes::download_object))
        .route("/upload", post(routes::upload_object))
        .route("/objects/*key", delete(routes::delete_object))
        // Bulk export
        .route("/bulk-download", get(routes::bulk_download))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(AppState::new(storage, catalog, config.clone()))
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins ("*" allows any origin)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server fails or the process receives Ctrl-C.
///
/// # Example
///
/// ```no_run
/// use b2_vault::api::{StaticCatalog, start_api_server};
/// use b2_vault::{Config, StorageClient};
/// use std::sync::Arc;
///
/// # async fn example() -> b2_vault::Result<()> {
/// let config = Arc::new(Config::from_env()?);
/// let storage = StorageClient::new(config.storage.clone(), config.retry.clone())?;
///
/// start_api_server(storage, Arc::new(StaticCatalog::default()), config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    storage: StorageClient,
    catalog: Arc<dyn SubmissionCatalog>,
    config: Arc<Config>,
) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(storage, catalog, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C, serving until killed");
        std::future::pending::<()>().await;
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
