//! The bulk export run loop.

use super::fetcher::{FetchedObject, ObjectFetcher, ProxyFetcher};
use super::progress::ProgressReporter;
use super::source::{BatchSource, InMemorySource};
use crate::archive::{self, ArchiveWriter};
use crate::config::ExportConfig;
use crate::error::{Error, ExportError, Result};
use crate::types::{BulkListing, ExportArchive, ExportOutcome, ProgressEvent, SubmissionRef};
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Packages stored objects into a single zip archive, batch by batch.
///
/// Batches run one after another with files fetched sequentially inside each
/// batch, so at most one fetch is in flight per run. Cancellation is checked
/// before every fetch and raced against every fetch, listing call and
/// inter-batch pause.
#[derive(Clone)]
pub struct BulkExporter {
    fetcher: Arc<dyn ObjectFetcher>,
    config: ExportConfig,
}

/// Whether the batch loop ran to completion
enum Flow {
    Finished,
    Cancelled,
}

/// Mutable state owned by one run
struct Run {
    writer: ArchiveWriter,
    reporter: ProgressReporter,
    files_done: usize,
    skipped: usize,
    total_files: usize,
    total_batches: usize,
}

impl Run {
    /// Emit `Failed` and wrap `err` with how far the run got
    fn fail(&mut self, err: Error) -> Error {
        let message = err.to_string();
        error!(
            files_done = self.files_done,
            total_files = self.total_files,
            error = %message,
            "bulk export failed"
        );
        self.reporter.emit(ProgressEvent::Failed {
            message: message.clone(),
        });
        Error::Export(ExportError {
            files_done: self.files_done,
            total_files: self.total_files,
            message,
        })
    }

    fn cancelled(&self) -> ExportOutcome {
        info!(
            files_done = self.files_done,
            total_files = self.total_files,
            "bulk export cancelled"
        );
        ExportOutcome::Cancelled {
            files_done: self.files_done,
            total_files: self.total_files,
        }
    }
}

impl BulkExporter {
    /// Create an exporter fetching objects through `fetcher`
    pub fn new(fetcher: Arc<dyn ObjectFetcher>, config: ExportConfig) -> Self {
        Self { fetcher, config }
    }

    /// Create an exporter fetching through the download proxy at `config.proxy_base_url`
    pub fn from_config(http: reqwest::Client, config: ExportConfig) -> Result<Self> {
        let raw = config.proxy_base_url.as_deref().ok_or_else(|| Error::Config {
            message: "a proxy base URL is required for proxy exports".to_string(),
            key: Some("export.proxy_base_url".to_string()),
        })?;
        let base_url = Url::parse(raw).map_err(|e| Error::Config {
            message: format!("invalid proxy base URL {raw}: {e}"),
            key: Some("export.proxy_base_url".to_string()),
        })?;
        Ok(Self::new(Arc::new(ProxyFetcher::new(http, base_url)), config))
    }

    /// Export settings in use
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export every file of `submissions` into one archive.
    ///
    /// Fails with [`Error::NothingToExport`] when no submission has files, and
    /// with [`Error::Export`] when a fetch or the archive step fails. Files the
    /// fetcher reports missing are skipped.
    pub async fn run_bulk_export(
        &self,
        submissions: &[SubmissionRef],
        progress: UnboundedSender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Result<ExportOutcome> {
        self.run(&InMemorySource::new(submissions), progress, cancel)
            .await
    }

    /// Export every file `source` lists, paging through it batch by batch
    pub async fn run(
        &self,
        source: &dyn BatchSource,
        progress: UnboundedSender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> Result<ExportOutcome> {
        let batch_size = self.config.batch_size;
        if batch_size == 0 {
            return Err(Error::Validation(
                "export batch size must be at least 1".to_string(),
            ));
        }

        let mut run = Run {
            writer: ArchiveWriter::new(self.config.compression_level),
            reporter: ProgressReporter::new(progress),
            files_done: 0,
            skipped: 0,
            total_files: 0,
            total_batches: 0,
        };

        let first = match until_cancelled(&cancel, source.fetch_batch(0, batch_size)).await {
            None => return Ok(run.cancelled()),
            Some(Ok(page)) => page,
            Some(Err(e)) => return Err(run.fail(e)),
        };

        run.total_files = first.batch.total;
        if run.total_files == 0 {
            info!("bulk export requested with no files");
            return Err(Error::NothingToExport);
        }
        run.total_batches = run.total_files.div_ceil(batch_size);

        info!(
            total_files = run.total_files,
            total_batches = run.total_batches,
            batch_size,
            "bulk export started"
        );
        run.reporter.emit(ProgressEvent::Preparing);

        match self.download_batches(source, first, &mut run, &cancel).await {
            Ok(Flow::Finished) => {}
            Ok(Flow::Cancelled) => return Ok(run.cancelled()),
            Err(e) => return Err(run.fail(e)),
        }

        if cancel.is_cancelled() {
            return Ok(run.cancelled());
        }

        let bytes = match serialize_archive(&mut run).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(run.fail(e)),
        };

        run.reporter.emit(ProgressEvent::Complete {
            files_done: run.files_done,
            total_files: run.total_files,
        });
        info!(
            files_done = run.files_done,
            skipped = run.skipped,
            size = bytes.len(),
            "bulk export complete"
        );

        Ok(ExportOutcome::Completed(ExportArchive {
            bytes,
            files_done: run.files_done,
            total_files: run.total_files,
            skipped: run.skipped,
        }))
    }

    async fn download_batches(
        &self,
        source: &dyn BatchSource,
        first: BulkListing,
        run: &mut Run,
        cancel: &CancellationToken,
    ) -> Result<Flow> {
        let mut first = Some(first);

        for batch_index in 0..run.total_batches {
            let files = match first.take() {
                Some(page) => page.files,
                None => {
                    if !self.config.batch_delay.is_zero()
                        && until_cancelled(cancel, tokio::time::sleep(self.config.batch_delay))
                            .await
                            .is_none()
                    {
                        return Ok(Flow::Cancelled);
                    }
                    match until_cancelled(
                        cancel,
                        source.fetch_batch(batch_index, self.config.batch_size),
                    )
                    .await
                    {
                        None => return Ok(Flow::Cancelled),
                        Some(page) => page?.files,
                    }
                }
            };

            debug!(batch_index, files = files.len(), "processing batch");

            for file in files {
                if cancel.is_cancelled() {
                    return Ok(Flow::Cancelled);
                }

                let fetched = match until_cancelled(cancel, self.fetcher.fetch(&file.file_key)).await {
                    None => return Ok(Flow::Cancelled),
                    Some(fetched) => fetched?,
                };

                match fetched {
                    FetchedObject::Missing { status } => {
                        run.skipped += 1;
                        warn!(
                            key = %file.file_key,
                            file_name = %file.file_name,
                            status,
                            "skipping file that could not be fetched"
                        );
                    }
                    FetchedObject::Bytes(bytes) => {
                        let path = archive::entry_path(
                            &file.student_name,
                            &file.student_email,
                            &file.file_name,
                        );
                        run.writer.add_file(&path, bytes);
                        run.files_done += 1;
                        run.reporter.emit(ProgressEvent::Downloading {
                            batch_index,
                            total_batches: run.total_batches,
                            files_done: run.files_done,
                            total_files: run.total_files,
                            current_file_name: Some(file.file_name),
                        });
                    }
                }
            }
        }

        Ok(Flow::Finished)
    }
}

/// Serialize the run's archive off the async runtime
async fn serialize_archive(run: &mut Run) -> Result<Bytes> {
    run.reporter.emit(ProgressEvent::Archiving { percent: 0 });

    let writer = std::mem::take(&mut run.writer);
    debug!(
        entries = writer.len(),
        uncompressed = writer.uncompressed_size(),
        "serializing archive"
    );
    let sink = run.reporter.archiving_sink();
    let bytes = tokio::task::spawn_blocking(move || writer.serialize(sink))
        .await
        .map_err(|e| Error::Other(format!("archive task failed: {e}")))??;

    Ok(Bytes::from(bytes))
}

/// Drive `future` unless `cancel` fires first (`None` when cancelled)
async fn until_cancelled<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}
