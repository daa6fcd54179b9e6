//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`objects`] - Download proxy, uploads and deletes
//! - [`bulk`] - Paged bulk listing for exports
//! - [`system`] - Health and OpenAPI

use serde::{Deserialize, Serialize};

mod bulk;
mod objects;
mod system;

pub use bulk::*;
pub use objects::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for POST /upload
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Key prefix for the stored object (default: "uploads")
    pub category: Option<String>,
}

/// Query parameters for DELETE /objects/*key
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct DeleteObjectQuery {
    /// Backend file id from the upload descriptor; looked up by key when absent
    pub file_id: Option<String>,
}

/// Query parameters for GET /bulk-download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct BulkDownloadQuery {
    /// Zero-based page index (default: 0)
    #[serde(default)]
    pub batch: usize,
    /// Files per page (default: the configured export batch size)
    pub batch_size: Option<usize>,
}
