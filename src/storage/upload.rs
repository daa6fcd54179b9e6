//! Upload targets and object uploads.

use super::StorageClient;
use super::keys::{encode_key_path, mint_key};
use super::wire::{GetUploadUrlRequest, GetUploadUrlResponse, UploadFileResponse};
use crate::error::{Error, Result};
use crate::types::{Authorization, StoredObjectDescriptor, StoredObjectKey, UploadTarget};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use url::Url;

/// The backend accepts at most this many `X-Bz-Info-*` headers per file
const MAX_INFO_HEADERS: usize = 10;

/// Parameters for uploading one object
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// File content; must be non-empty
    pub bytes: Bytes,
    /// Original file name, kept for the descriptor and error messages
    pub display_name: String,
    /// MIME type sent as `Content-Type`
    pub content_type: String,
    /// Key prefix, e.g. "submissions/course-42" (default: "uploads")
    pub category: String,
    /// Custom metadata sent as `X-Bz-Info-<key>` headers
    pub metadata: BTreeMap<String, String>,
}

impl UploadRequest {
    /// Upload `bytes` under the default "uploads" category with no metadata
    pub fn new(
        bytes: impl Into<Bytes>,
        display_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            display_name: display_name.into(),
            content_type: content_type.into(),
            category: "uploads".to_string(),
            metadata: BTreeMap::new(),
        }
    }

    /// Set the key prefix
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Attach one metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl StorageClient {
    /// Obtain a fresh single-use upload target.
    ///
    /// Targets are never cached: the backend scopes each one to a single upload.
    pub async fn request_upload_target(&self) -> Result<UploadTarget> {
        self.retrying("request_upload_target", || async move {
            let auth = self.credentials.get().await?;
            self.get_upload_target(&auth).await
        })
        .await
    }

    /// Upload one object and return its descriptor.
    ///
    /// Input is validated before any network call. The key is minted once; each
    /// attempt authenticates (if needed) and asks for a new upload target.
    pub async fn upload(&self, request: UploadRequest) -> Result<StoredObjectDescriptor> {
        self.validate_upload(&request)?;

        let content_hash = hex::encode(Sha1::digest(&request.bytes));
        let key = mint_key(&request.category, &request.display_name);

        tracing::debug!(
            key = %key,
            size = request.bytes.len(),
            content_type = %request.content_type,
            "uploading object"
        );

        let (key, content_hash, request) = (&key, content_hash.as_str(), &request);
        let descriptor = self
            .retrying("upload", || async move {
                let auth = self.credentials.get().await?;
                let target = self.get_upload_target(&auth).await?;
                self.post_upload(&auth, &target, key, content_hash, request)
                    .await
            })
            .await?;

        tracing::info!(
            key = %descriptor.key,
            size = descriptor.size,
            file_id = %descriptor.file_id,
            "object uploaded"
        );
        Ok(descriptor)
    }

    fn validate_upload(&self, request: &UploadRequest) -> Result<()> {
        let len = request.bytes.len() as u64;
        if len == 0 {
            return Err(Error::Validation(format!(
                "{} is empty",
                request.display_name
            )));
        }
        let limit = self.config.upload_limit();
        if len > limit {
            return Err(Error::Validation(format!(
                "{} is {} bytes, limit is {} bytes",
                request.display_name, len, limit
            )));
        }
        if request.metadata.len() > MAX_INFO_HEADERS {
            return Err(Error::Validation(format!(
                "at most {MAX_INFO_HEADERS} metadata entries are allowed"
            )));
        }
        if let Some(bad) = request.metadata.keys().find(|k| {
            k.is_empty()
                || !k
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }) {
            return Err(Error::Validation(format!("invalid metadata key {bad:?}")));
        }
        Ok(())
    }

    async fn get_upload_target(&self, auth: &Authorization) -> Result<UploadTarget> {
        let response: GetUploadUrlResponse = self
            .api_post(
                auth,
                "b2_get_upload_url",
                &GetUploadUrlRequest {
                    bucket_id: &self.config.bucket_id,
                },
            )
            .await?;

        let upload_url = Url::parse(&response.upload_url).map_err(|e| Error::Backend {
            status: 200,
            code: "invalid_upload_url".to_string(),
            message: e.to_string(),
        })?;

        Ok(UploadTarget {
            upload_url,
            auth_token: response.authorization_token,
        })
    }

    async fn post_upload(
        &self,
        auth: &Authorization,
        target: &UploadTarget,
        key: &StoredObjectKey,
        content_hash: &str,
        request: &UploadRequest,
    ) -> Result<StoredObjectDescriptor> {
        let mut builder = self
            .http
            .post(target.upload_url.clone())
            .header(reqwest::header::AUTHORIZATION, &target.auth_token)
            .header(reqwest::header::CONTENT_TYPE, &request.content_type)
            .header("X-Bz-File-Name", encode_key_path(key.as_str()))
            .header("X-Bz-Content-Sha1", content_hash);

        for (name, value) in &request.metadata {
            builder = builder.header(
                format!("X-Bz-Info-{name}"),
                urlencoding::encode(value).into_owned(),
            );
        }

        let response = builder
            .body(request.bytes.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    Error::Network(e)
                } else {
                    Error::Upload {
                        file_name: request.display_name.clone(),
                        status: None,
                        reason: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(match self.reject(auth, response).await {
                Error::Backend {
                    status,
                    code,
                    message,
                } => Error::Upload {
                    file_name: request.display_name.clone(),
                    status: Some(status),
                    reason: format!("{code}: {message}"),
                },
                other => other,
            });
        }

        let body: UploadFileResponse = response.json().await.map_err(|e| Error::Upload {
            file_name: request.display_name.clone(),
            status: None,
            reason: format!("malformed upload response: {e}"),
        })?;

        if body.content_sha1 != content_hash {
            tracing::warn!(
                key = %key,
                expected = content_hash,
                actual = %body.content_sha1,
                "backend reported a different content hash"
            );
        }

        Ok(StoredObjectDescriptor {
            key: StoredObjectKey::new(body.file_name),
            display_name: request.display_name.clone(),
            size: body.content_length,
            content_hash: body.content_sha1,
            file_id: body.file_id,
        })
    }
}
