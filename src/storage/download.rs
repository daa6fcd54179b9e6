//! Signed download URLs and object fetches.

use super::StorageClient;
use super::keys::encode_key_path;
use super::wire::{GetDownloadAuthorizationRequest, GetDownloadAuthorizationResponse};
use crate::error::{Error, Result};
use crate::types::{Authorization, StoredObjectKey};
use bytes::Bytes;
use url::Url;

/// Longest download authorization the backend will grant (one week)
pub const MAX_DOWNLOAD_TTL_SECS: u64 = 604_800;

/// Lifetime of the URLs minted for server-side fetches
const FETCH_URL_TTL_SECS: u64 = 60;

impl StorageClient {
    /// Mint a time-bounded URL from which `key` can be downloaded without credentials.
    ///
    /// The authorization is scoped to `key` as a file-name prefix.
    pub async fn signed_download_url(
        &self,
        key: &StoredObjectKey,
        ttl_seconds: u64,
    ) -> Result<Url> {
        if ttl_seconds == 0 || ttl_seconds > MAX_DOWNLOAD_TTL_SECS {
            return Err(Error::Validation(format!(
                "download ttl must be between 1 and {MAX_DOWNLOAD_TTL_SECS} seconds, got {ttl_seconds}"
            )));
        }

        self.retrying("signed_download_url", || async move {
            let auth = self.credentials.get().await?;
            let response: GetDownloadAuthorizationResponse = self
                .api_post(
                    &auth,
                    "b2_get_download_authorization",
                    &GetDownloadAuthorizationRequest {
                        bucket_id: &self.config.bucket_id,
                        file_name_prefix: key.as_str(),
                        valid_duration_in_seconds: ttl_seconds,
                    },
                )
                .await?;

            Ok(self.compose_download_url(&auth, key, &response.authorization_token))
        })
        .await
    }

    /// Download an object's bytes through a short-lived signed URL
    pub async fn fetch_object(&self, key: &StoredObjectKey) -> Result<Bytes> {
        let url = self.signed_download_url(key, FETCH_URL_TTL_SECS).await?;
        let url = &url;

        self.retrying("fetch_object", || async move {
            let response = self.http.get(url.clone()).send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(Error::NotFound(key.to_string()));
            }
            if !status.is_success() {
                return Err(Error::Download {
                    file_name: key.to_string(),
                    status: Some(status.as_u16()),
                    reason: format!("backend returned {status}"),
                });
            }

            Ok(response.bytes().await?)
        })
        .await
    }

    /// `<downloadUrl>/file/<bucketName>/<key>?Authorization=<token>`
    fn compose_download_url(
        &self,
        auth: &Authorization,
        key: &StoredObjectKey,
        token: &str,
    ) -> Url {
        let mut url = auth.download_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!(
            "{}/file/{}/{}",
            base_path,
            self.config.bucket_name,
            encode_key_path(key.as_str())
        ));
        url.query_pairs_mut().clear().append_pair("Authorization", token);
        url
    }
}
