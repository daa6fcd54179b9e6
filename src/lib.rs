//! # b2-vault
//!
//! Authenticated client for B2 object storage with a cancellable bulk-export
//! pipeline.
//!
//! ## Design Philosophy
//!
//! b2-vault is designed to be:
//! - **Explicit about credentials** - One shared [`CredentialCache`] with single-flight refresh
//! - **Resilient** - Every backend call runs under an exponential-backoff retry policy
//! - **Library-first** - The HTTP surface in [`api`] is optional glue over the library
//! - **Event-driven** - Bulk exports report typed [`ProgressEvent`]s on a channel
//!
//! ## Quick Start
//!
//! ```no_run
//! use b2_vault::{Config, StorageClient, UploadRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = StorageClient::new(config.storage, config.retry)?;
//!
//!     let stored = client
//!         .upload(UploadRequest::new(b"hello".to_vec(), "hello.txt", "text/plain"))
//!         .await?;
//!
//!     let url = client.signed_download_url(&stored.key, 3600).await?;
//!     println!("{} -> {url}", stored.key);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Zip archive assembly and naming
pub mod archive;
/// Configuration types
pub mod config;
/// Cached backend authorization
pub mod credentials;
/// Error types
pub mod error;
/// Bulk export pipeline
pub mod export;
/// Retry logic with exponential backoff
pub mod retry;
/// Storage backend client
pub mod storage;
/// Tabular export of submissions
pub mod tabular;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use archive::{ArchiveWriter, archive_file_name};
pub use config::{Config, ExportConfig, RetryConfig, StorageConfig};
pub use credentials::{Authenticator, B2Authenticator, CredentialCache};
pub use error::{ApiError, Error, ErrorDetail, ExportError, Result, ToHttpStatus};
pub use export::{BatchSource, BulkExporter, ObjectFetcher};
pub use retry::{IsRetryable, with_retry};
pub use storage::{StorageClient, UploadRequest};
pub use types::{
    ExportArchive, ExportFile, ExportOutcome, ProgressEvent, StoredObjectDescriptor,
    StoredObjectKey, SubmissionFile, SubmissionRef,
};
