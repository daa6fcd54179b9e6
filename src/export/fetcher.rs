//! Fetching object bytes for an export.

use crate::error::{Error, Result};
use crate::storage::StorageClient;
use crate::storage::keys::encode_key_path;
use crate::types::StoredObjectKey;
use bytes::Bytes;
use url::Url;

/// Result of fetching one object
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchedObject {
    /// Object content
    Bytes(Bytes),
    /// The server answered without the object (404 or another non-2xx status)
    Missing {
        /// Status the server answered with
        status: u16,
    },
}

/// Abstraction over object downloads, enabling testability.
///
/// `Missing` is reported for objects the run should skip; `Err` aborts the run.
#[async_trait::async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Fetch the bytes stored under `key`
    async fn fetch(&self, key: &StoredObjectKey) -> Result<FetchedObject>;
}

/// Fetches through the same-origin download proxy (`GET <base>/download/<key>`)
#[derive(Clone, Debug)]
pub struct ProxyFetcher {
    http: reqwest::Client,
    base_url: Url,
}

impl ProxyFetcher {
    /// Fetch from the proxy served under `base_url`
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn object_url(&self, key: &StoredObjectKey) -> String {
        format!(
            "{}/download/{}",
            self.base_url.as_str().trim_end_matches('/'),
            encode_key_path(key.as_str())
        )
    }
}

#[async_trait::async_trait]
impl ObjectFetcher for ProxyFetcher {
    async fn fetch(&self, key: &StoredObjectKey) -> Result<FetchedObject> {
        let response = self.http.get(self.object_url(key)).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Ok(FetchedObject::Missing {
                status: status.as_u16(),
            });
        }

        Ok(FetchedObject::Bytes(response.bytes().await?))
    }
}

#[async_trait::async_trait]
impl ObjectFetcher for StorageClient {
    async fn fetch(&self, key: &StoredObjectKey) -> Result<FetchedObject> {
        match self.fetch_object(key).await {
            Ok(bytes) => Ok(FetchedObject::Bytes(bytes)),
            Err(Error::NotFound(_)) => Ok(FetchedObject::Missing { status: 404 }),
            Err(Error::Download {
                status: Some(status),
                ..
            }) => Ok(FetchedObject::Missing { status }),
            Err(e) => Err(e),
        }
    }
}
