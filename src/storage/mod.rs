//! Authenticated client for the B2 object-storage backend.
//!
//! The `StorageClient` methods are organized by operation:
//! - [`upload`] - Upload targets and object uploads
//! - [`download`] - Signed download URLs and object fetches
//! - [`delete`] - Listing by prefix and deletes
//!
//! Every operation runs through [`with_retry`](crate::retry::with_retry). An
//! attempt that is answered with an expired or invalid token drops the cached
//! authorization first, so the next attempt re-authenticates.

mod delete;
mod download;
pub mod keys;
mod upload;
pub(crate) mod wire;

pub use download::MAX_DOWNLOAD_TTL_SECS;
pub use upload::UploadRequest;
pub use wire::ListedFile;

use crate::config::{RetryConfig, StorageConfig};
use crate::credentials::{B2Authenticator, CredentialCache};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::Authorization;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;

/// Backend error codes that mean the token must be replaced
const TOKEN_REJECTED_CODES: &[&str] = &["expired_auth_token", "bad_auth_token"];

/// Backend error codes that mean an account cap was reached
const QUOTA_CODES: &[&str] = &[
    "cap_exceeded",
    "storage_cap_exceeded",
    "transaction_cap_exceeded",
    "download_cap_exceeded",
];

/// Backend error codes that mean the object does not exist
const NOT_FOUND_CODES: &[&str] = &["not_found", "file_not_present", "no_such_file"];

/// Client for upload, signed download, list and delete operations (cloneable)
#[derive(Clone)]
pub struct StorageClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: Arc<StorageConfig>,
    pub(crate) retry: RetryConfig,
    pub(crate) credentials: Arc<CredentialCache>,
}

impl StorageClient {
    /// Create a client that authenticates against `config.auth_root`
    pub fn new(config: StorageConfig, retry: RetryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let authenticator = Arc::new(B2Authenticator::new(http.clone(), &config));
        let credentials = Arc::new(CredentialCache::new(
            authenticator,
            config.authorization_ttl,
        ));
        Ok(Self::with_credentials(http, config, retry, credentials))
    }

    /// Create a client sharing an existing credential cache
    pub fn with_credentials(
        http: reqwest::Client,
        config: StorageConfig,
        retry: RetryConfig,
        credentials: Arc<CredentialCache>,
    ) -> Self {
        Self {
            http,
            config: Arc::new(config),
            retry,
            credentials,
        }
    }

    /// The shared credential cache
    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    /// Storage configuration in use
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Run one operation under the retry policy, logging its name on failure
    pub(crate) async fn retrying<T, F, Fut>(&self, operation: &'static str, attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retry(&self.retry, attempt).await.inspect_err(|e| {
            tracing::warn!(operation, error = %e, "storage operation failed");
        })
    }

    /// POST a JSON body to a native API endpoint with the account token
    pub(crate) async fn api_post<B, R>(
        &self,
        auth: &Authorization,
        endpoint: &str,
        body: &B,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!(
            "{}/b2api/v2/{}",
            auth.api_url.as_str().trim_end_matches('/'),
            endpoint
        );

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, &auth.token)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.reject(auth, response).await);
        }

        Ok(response.json().await?)
    }

    /// Classify a non-2xx response, dropping `auth` from the cache if it was refused
    pub(crate) async fn reject(&self, auth: &Authorization, response: reqwest::Response) -> Error {
        let err = error_from_response(response).await;
        if matches!(err, Error::TokenExpired { .. }) {
            self.credentials.invalidate_token(&auth.token).await;
        }
        err
    }
}

/// Map a non-2xx backend response onto the error taxonomy
pub(crate) async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body: wire::ErrorBody = response.json().await.unwrap_or_default();
    classify(status, body.code, body.message)
}

fn classify(status: u16, code: String, message: String) -> Error {
    let code_is = |codes: &[&str]| codes.contains(&code.as_str());

    if status == 401 && code_is(TOKEN_REJECTED_CODES) {
        Error::TokenExpired { code }
    } else if code_is(QUOTA_CODES) {
        Error::QuotaExceeded(if message.is_empty() { code } else { message })
    } else if status == 404 || code_is(NOT_FOUND_CODES) {
        Error::NotFound(if message.is_empty() { code } else { message })
    } else {
        Error::Backend {
            status,
            code,
            message,
        }
    }
}
