//! Where an export run gets its file list from.

use crate::error::{Error, Result};
use crate::types::{BulkListing, ExportFile, SubmissionRef};
use url::Url;

/// Pages of files for a bulk export.
///
/// Page `index` of size `size` holds files `index * size .. (index + 1) * size`
/// of the flattened collection; every page reports the overall file total.
#[async_trait::async_trait]
pub trait BatchSource: Send + Sync {
    /// Fetch page `index` of at most `size` files
    async fn fetch_batch(&self, index: usize, size: usize) -> Result<BulkListing>;
}

/// Caller-supplied submissions, flattened once up front
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    files: Vec<ExportFile>,
}

impl InMemorySource {
    /// Flatten `submissions` into `(submission, file)` pairs
    pub fn new(submissions: &[SubmissionRef]) -> Self {
        Self {
            files: ExportFile::flatten(submissions),
        }
    }
}

#[async_trait::async_trait]
impl BatchSource for InMemorySource {
    async fn fetch_batch(&self, index: usize, size: usize) -> Result<BulkListing> {
        Ok(BulkListing::page(&self.files, index, size))
    }
}

/// Server-resident submissions paged through `GET <base>/bulk-download`
#[derive(Clone, Debug)]
pub struct ListingSource {
    http: reqwest::Client,
    endpoint: Url,
}

impl ListingSource {
    /// Page through the listing served under `base_url`
    pub fn new(http: reqwest::Client, base_url: &Url) -> Result<Self> {
        let raw = format!("{}/bulk-download", base_url.as_str().trim_end_matches('/'));
        let endpoint = Url::parse(&raw)
            .map_err(|e| Error::Validation(format!("invalid listing URL {raw}: {e}")))?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait::async_trait]
impl BatchSource for ListingSource {
    async fn fetch_batch(&self, index: usize, size: usize) -> Result<BulkListing> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("batch", index), ("batchSize", size)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download {
                file_name: format!("bulk listing page {index}"),
                status: Some(status.as_u16()),
                reason: format!("listing endpoint returned {status}"),
            });
        }

        Ok(response.json().await?)
    }
}
