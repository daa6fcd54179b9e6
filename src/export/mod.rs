//! Bulk export of stored objects into a single archive.
//!
//! A run pages through a [`BatchSource`], fetches every listed object with an
//! [`ObjectFetcher`] and packages the bytes into per-owner folders of a zip
//! archive, reporting [`ProgressEvent`](crate::types::ProgressEvent)s on a
//! channel as it goes.
//!
//! - [`source`] - In-memory submissions and the paged bulk listing endpoint
//! - [`fetcher`] - Download proxy and direct storage fetchers
//! - [`runner`] - The [`BulkExporter`] run loop
//!
//! # Example
//!
//! ```no_run
//! use b2_vault::config::ExportConfig;
//! use b2_vault::export::BulkExporter;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(submissions: Vec<b2_vault::SubmissionRef>) -> b2_vault::Result<()> {
//! let config = ExportConfig {
//!     proxy_base_url: Some("https://app.example.org".into()),
//!     ..Default::default()
//! };
//! let exporter = BulkExporter::from_config(reqwest::Client::new(), config)?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{event:?}");
//!     }
//! });
//!
//! let outcome = exporter
//!     .run_bulk_export(&submissions, tx, CancellationToken::new())
//!     .await?;
//! if let Some(archive) = outcome.archive() {
//!     std::fs::write("submissions.zip", &archive.bytes)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod fetcher;
mod progress;
pub mod runner;
pub mod source;

pub use fetcher::{FetchedObject, ObjectFetcher, ProxyFetcher};
pub use runner::BulkExporter;
pub use source::{BatchSource, InMemorySource, ListingSource};
