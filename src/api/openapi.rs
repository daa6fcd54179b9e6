//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the b2-vault REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the b2-vault REST API
///
/// Served at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "b2-vault REST API",
        version = "0.1.0",
        description = "Same-origin download proxy, uploads, deletes and paged bulk listings backed by B2 object storage",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Objects
        crate::api::routes::download_object,
        crate::api::routes::upload_object,
        crate::api::routes::delete_object,

        // Bulk export
        crate::api::routes::bulk_download,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::StoredObjectKey,
        crate::types::StoredObjectDescriptor,
        crate::types::SubmissionFile,
        crate::types::SubmissionRef,
        crate::types::ExportFile,
        crate::types::BatchInfo,
        crate::types::BulkListing,
        crate::types::ProgressEvent,

        // Config types from config.rs
        crate::config::RetryConfig,
        crate::config::ExportConfig,
        crate::config::ApiConfig,

        // API request types from routes
        crate::api::routes::UploadQuery,
        crate::api::routes::DeleteObjectQuery,
        crate::api::routes::BulkDownloadQuery,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "objects", description = "Stored objects - Download proxy, uploads and deletes"),
        (name = "bulk", description = "Bulk export - Paged listing of the files to package"),
        (name = "system", description = "System endpoints - Health check and OpenAPI spec"),
    )
)]
pub struct ApiDoc;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_route() {
        let spec = ApiDoc::openapi();
        let paths: Vec<&str> = spec.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/download/{key}",
            "/upload",
            "/objects/{key}",
            "/bulk-download",
            "/health",
            "/openapi.json",
        ] {
            assert!(paths.contains(&expected), "missing path {expected}");
        }
    }

    #[test]
    fn spec_has_error_schema() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components should be present");
        assert!(components.schemas.contains_key("ApiError"));
        assert!(components.schemas.contains_key("BulkListing"));
    }

    #[test]
    fn spec_serializes_to_json() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("b2-vault REST API"));
    }
}
