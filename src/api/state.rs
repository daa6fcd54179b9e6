//! Application state for the API server

use crate::Config;
use crate::error::Result;
use crate::storage::StorageClient;
use crate::types::SubmissionRef;
use std::sync::Arc;

/// Source of the server-resident submissions served by `GET /bulk-download`
#[async_trait::async_trait]
pub trait SubmissionCatalog: Send + Sync {
    /// All submissions, in listing order
    async fn submissions(&self) -> Result<Vec<SubmissionRef>>;
}

/// Catalog over a fixed list of submissions
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    submissions: Vec<SubmissionRef>,
}

impl StaticCatalog {
    /// Serve `submissions` as-is
    pub fn new(submissions: Vec<SubmissionRef>) -> Self {
        Self { submissions }
    }
}

#[async_trait::async_trait]
impl SubmissionCatalog for StaticCatalog {
    async fn submissions(&self) -> Result<Vec<SubmissionRef>> {
        Ok(self.submissions.clone())
    }
}

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clones).
#[derive(Clone)]
pub struct AppState {
    /// Storage client shared by every handler (and its credential cache)
    pub storage: StorageClient,

    /// Submissions paged by the bulk listing
    pub catalog: Arc<dyn SubmissionCatalog>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(
        storage: StorageClient,
        catalog: Arc<dyn SubmissionCatalog>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            storage,
            catalog,
            config,
        }
    }
}
