//! Paged bulk listing consumed by [`ListingSource`](crate::export::ListingSource).

use super::BulkDownloadQuery;
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{BulkListing, ExportFile};
use axum::{
    Json,
    extract::{Query, State},
};

/// Largest page a client may request
pub const MAX_BULK_BATCH_SIZE: usize = 100;

/// GET /bulk-download - One page of the files to export
#[utoipa::path(
    get,
    path = "/bulk-download",
    tag = "bulk",
    params(BulkDownloadQuery),
    responses(
        (status = 200, description = "Page of files with overall totals", body = BulkListing),
        (status = 400, description = "Invalid batch size", body = crate::error::ApiError)
    )
)]
pub async fn bulk_download(
    State(state): State<AppState>,
    Query(query): Query<BulkDownloadQuery>,
) -> Result<Json<BulkListing>> {
    let size = query
        .batch_size
        .unwrap_or(state.config.export.batch_size);
    if size == 0 || size > MAX_BULK_BATCH_SIZE {
        return Err(Error::Validation(format!(
            "batchSize must be between 1 and {MAX_BULK_BATCH_SIZE}, got {size}"
        )));
    }

    let submissions = state.catalog.submissions().await?;
    let files = ExportFile::flatten(&submissions);
    let listing = BulkListing::page(&files, query.batch, size);

    tracing::debug!(
        batch = query.batch,
        batch_size = size,
        files = listing.files.len(),
        total = listing.batch.total,
        "bulk listing page served"
    );
    Ok(Json(listing))
}
