//! Object handlers: same-origin download proxy, uploads and deletes.

use super::{DeleteObjectQuery, UploadQuery};
use crate::api::AppState;
use crate::error::{Error, Result};
use crate::storage::UploadRequest;
use crate::types::{StoredObjectDescriptor, StoredObjectKey};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// GET /download/*key - Stream an object's bytes without exposing credentials
#[utoipa::path(
    get,
    path = "/download/{key}",
    tag = "objects",
    params(
        ("key" = String, Path, description = "Stored object key")
    ),
    responses(
        (status = 200, description = "Object content", content_type = "application/octet-stream"),
        (status = 404, description = "Object not found", body = crate::error::ApiError),
        (status = 502, description = "Storage backend failure", body = crate::error::ApiError)
    )
)]
pub async fn download_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let key = StoredObjectKey::new(key);
    let bytes = state.storage.fetch_object(&key).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response())
}

/// POST /upload - Store a file from a multipart form
#[utoipa::path(
    post,
    path = "/upload",
    tag = "objects",
    params(UploadQuery),
    request_body(content = Vec<u8>, description = "File upload (multipart/form-data, field `file`)", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Object stored", body = StoredObjectDescriptor),
        (status = 400, description = "Missing or invalid file", body = crate::error::ApiError),
        (status = 507, description = "Storage quota exceeded", body = crate::error::ApiError),
        (status = 502, description = "Storage backend failure", body = crate::error::ApiError)
    )
)]
pub async fn upload_object(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut upload: Option<UploadRequest> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let display_name = field.file_name().unwrap_or("upload.bin").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::Validation(format!("failed to read file: {e}")))?;

        upload = Some(UploadRequest::new(bytes, display_name, content_type));
    }

    let mut request =
        upload.ok_or_else(|| Error::Validation("no file provided in 'file' field".to_string()))?;
    if let Some(category) = query.category {
        request = request.with_category(category);
    }

    let descriptor = state.storage.upload(request).await?;
    Ok((StatusCode::CREATED, Json(descriptor)).into_response())
}

/// DELETE /objects/*key - Delete a stored object
#[utoipa::path(
    delete,
    path = "/objects/{key}",
    tag = "objects",
    params(
        ("key" = String, Path, description = "Stored object key"),
        DeleteObjectQuery
    ),
    responses(
        (status = 204, description = "Object deleted"),
        (status = 404, description = "Object not found", body = crate::error::ApiError),
        (status = 502, description = "Storage backend failure", body = crate::error::ApiError)
    )
)]
pub async fn delete_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<DeleteObjectQuery>,
) -> Result<StatusCode> {
    let key = StoredObjectKey::new(key);
    state
        .storage
        .delete(&key, query.file_id.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
