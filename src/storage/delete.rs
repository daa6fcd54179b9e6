//! Listing by prefix and deletes.

use super::StorageClient;
use super::wire::{DeleteFileVersionRequest, ListFileNamesRequest, ListFileNamesResponse, ListedFile};
use crate::error::{Error, Result};
use crate::types::StoredObjectKey;

impl StorageClient {
    /// List up to `max_file_count` objects whose key starts with `prefix`
    pub async fn list_file_names(&self, prefix: &str, max_file_count: u32) -> Result<Vec<ListedFile>> {
        self.retrying("list_file_names", || async move {
            let auth = self.credentials.get().await?;
            let response: ListFileNamesResponse = self
                .api_post(
                    &auth,
                    "b2_list_file_names",
                    &ListFileNamesRequest {
                        bucket_id: &self.config.bucket_id,
                        prefix,
                        max_file_count,
                    },
                )
                .await?;
            Ok(response.files)
        })
        .await
    }

    /// Delete an object.
    ///
    /// Without `backend_file_id` the id is resolved first by listing the key as
    /// a prefix; a key with no exact match fails with [`Error::NotFound`].
    pub async fn delete(&self, key: &StoredObjectKey, backend_file_id: Option<&str>) -> Result<()> {
        let file_id = match backend_file_id {
            Some(id) => id.to_string(),
            None => self.resolve_file_id(key).await?,
        };
        let file_id = file_id.as_str();

        self.retrying("delete", || async move {
            let auth = self.credentials.get().await?;
            let _: serde_json::Value = self
                .api_post(
                    &auth,
                    "b2_delete_file_version",
                    &DeleteFileVersionRequest {
                        file_id,
                        file_name: key.as_str(),
                    },
                )
                .await?;
            Ok(())
        })
        .await?;

        tracing::info!(key = %key, file_id, "object deleted");
        Ok(())
    }

    async fn resolve_file_id(&self, key: &StoredObjectKey) -> Result<String> {
        // The listing is prefix-based; keys sharing the prefix must not match
        self.list_file_names(key.as_str(), 1)
            .await?
            .into_iter()
            .find(|file| file.file_name == key.as_str())
            .map(|file| file.file_id)
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }
}
