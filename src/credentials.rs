//! Credential cache for the storage backend.
//!
//! The cache holds one [`Authorization`] shared by every caller. Reads of a valid
//! value never block on each other; when the value is missing or stale, exactly
//! one caller performs the authenticate call while the others wait for its result.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::storage::wire::{AuthorizeAccountResponse, ErrorBody};
use crate::types::Authorization;
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// Account credentials as returned by the backend, before expiry is stamped
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountGrant {
    /// Account authorization token
    pub token: String,
    /// Base URL for API calls
    pub api_url: Url,
    /// Base URL for downloads
    pub download_url: Url,
}

/// Abstraction over the backend authenticate call, enabling testability.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Perform one authenticate round trip
    async fn authorize(&self) -> Result<AccountGrant>;
}

/// Production [`Authenticator`] calling `b2_authorize_account` with HTTP Basic auth.
pub struct B2Authenticator {
    http: reqwest::Client,
    auth_root: String,
    key_id: String,
    application_key: String,
}

impl B2Authenticator {
    /// Create an authenticator from storage configuration
    pub fn new(http: reqwest::Client, config: &StorageConfig) -> Self {
        Self {
            http,
            auth_root: config.auth_root.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            application_key: config.application_key.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Authenticator for B2Authenticator {
    async fn authorize(&self) -> Result<AccountGrant> {
        let url = format!("{}/b2_authorize_account", self.auth_root);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.application_key))
            .send()
            .await
            .map_err(|e| Error::AuthBackend {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(Error::AuthBackend {
                status: Some(status.as_u16()),
                message: format!("{}: {}", body.code, body.message),
            });
        }

        let body: AuthorizeAccountResponse =
            response.json().await.map_err(|e| Error::AuthBackend {
                status: Some(status.as_u16()),
                message: format!("malformed authorize response: {e}"),
            })?;

        let parse = |field: &str, value: &str| {
            Url::parse(value).map_err(|e| Error::AuthBackend {
                status: Some(status.as_u16()),
                message: format!("invalid {field} {value:?}: {e}"),
            })
        };

        Ok(AccountGrant {
            api_url: parse("apiUrl", &body.api_url)?,
            download_url: parse("downloadUrl", &body.download_url)?,
            token: body.authorization_token,
        })
    }
}

/// Failure of the last authenticate call, replayed to callers that waited on it
#[derive(Clone, Debug)]
struct RefreshFailure {
    status: Option<u16>,
    message: String,
}

impl RefreshFailure {
    fn from_error(err: &Error) -> Self {
        match err {
            Error::AuthBackend { status, message } => Self {
                status: *status,
                message: message.clone(),
            },
            other => Self {
                status: None,
                message: other.to_string(),
            },
        }
    }

    fn to_error(&self) -> Error {
        Error::AuthBackend {
            status: self.status,
            message: self.message.clone(),
        }
    }
}

/// Process-wide, lazily refreshed authorization with single-flight refresh
pub struct CredentialCache {
    authenticator: Arc<dyn Authenticator>,
    ttl: TimeDelta,
    current: RwLock<Option<Authorization>>,
    refresh_lock: Mutex<Option<RefreshFailure>>,
    completed_refreshes: AtomicU64,
    refreshes: AtomicU64,
    invalidations: AtomicU64,
}

impl CredentialCache {
    /// Create an empty cache; the first [`get`](Self::get) authenticates.
    ///
    /// `ttl` is how long a fetched authorization is trusted.
    pub fn new(authenticator: Arc<dyn Authenticator>, ttl: std::time::Duration) -> Self {
        Self {
            authenticator,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::hours(23)),
            current: RwLock::new(None),
            refresh_lock: Mutex::new(None),
            completed_refreshes: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Return a valid authorization, authenticating if the cached one is stale.
    ///
    /// Concurrent callers arriving while a refresh is in flight wait for it and
    /// share its result instead of issuing their own authenticate call. That
    /// holds for a failed refresh too: its waiters get the same error.
    pub async fn get(&self) -> Result<Authorization> {
        if let Some(auth) = self.cached().await {
            return Ok(auth);
        }

        let seen = self.completed_refreshes.load(Ordering::SeqCst);
        let mut last_failure = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(auth) = self.cached().await {
            return Ok(auth);
        }
        if self.completed_refreshes.load(Ordering::SeqCst) != seen
            && let Some(failure) = last_failure.as_ref()
        {
            return Err(failure.to_error());
        }

        tracing::debug!("refreshing storage authorization");
        let result = self.authenticator.authorize().await;
        *last_failure = result.as_ref().err().map(RefreshFailure::from_error);
        self.completed_refreshes.fetch_add(1, Ordering::SeqCst);
        let grant = result.inspect_err(|e| {
            tracing::warn!(error = %e, "storage authorization refresh failed");
        })?;
        let auth = Authorization {
            token: grant.token,
            api_url: grant.api_url,
            download_url: grant.download_url,
            expires_at: Utc::now() + self.ttl,
        };

        *self.current.write().await = Some(auth.clone());
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        tracing::info!(expires_at = %auth.expires_at, "storage authorization refreshed");

        Ok(auth)
    }

    /// Drop the cached authorization so the next [`get`](Self::get) re-authenticates
    pub async fn invalidate(&self) {
        if self.current.write().await.take().is_some() {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("storage authorization invalidated");
        }
    }

    /// Drop the cached authorization only if it still carries `token`.
    ///
    /// A caller that saw `token` rejected must not discard a newer authorization
    /// another caller already fetched. Returns whether anything was dropped.
    pub async fn invalidate_token(&self, token: &str) -> bool {
        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|auth| auth.token == token) {
            *current = None;
            self.invalidations.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("rejected storage authorization invalidated");
            true
        } else {
            false
        }
    }

    /// Number of successful authenticate calls so far
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Number of times a cached authorization was discarded
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations.load(Ordering::SeqCst)
    }

    async fn cached(&self) -> Option<Authorization> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|auth| auth.is_valid_at(Utc::now()))
            .cloned()
    }
}
