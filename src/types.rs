//! Core types for b2-vault

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

/// Time-bounded account authorization for the storage backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorization {
    /// Account authorization token
    pub token: String,
    /// Base URL for API calls (upload targets, listing, deletes)
    pub api_url: Url,
    /// Base URL for file downloads
    pub download_url: Url,
    /// Instant after which the token must not be used
    pub expires_at: DateTime<Utc>,
}

impl Authorization {
    /// Whether the authorization can still be used at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Single-use upload destination
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadTarget {
    /// URL the bytes are posted to
    pub upload_url: Url,
    /// Token scoped to this upload URL
    pub auth_token: String,
}

/// Opaque, immutable identifier of an object in the bucket namespace
///
/// Minted as `<category>/<timestamp>-<random>-<sanitized-name>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct StoredObjectKey(String);

impl StoredObjectKey {
    /// Wrap a key previously minted and persisted by the caller
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as stored in the backend
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoredObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoredObjectKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for StoredObjectKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Result of a successful upload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredObjectDescriptor {
    /// Durable key the caller persists
    pub key: StoredObjectKey,
    /// Original human-readable file name
    pub display_name: String,
    /// Size in bytes
    pub size: u64,
    /// Hex-encoded SHA-1 of the content
    pub content_hash: String,
    /// Backend-internal file version id (speeds up later deletes)
    pub file_id: String,
}

/// One stored file attached to a submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionFile {
    /// Storage key of the file
    pub key: StoredObjectKey,
    /// Name shown to users and used inside the archive
    pub display_name: String,
}

/// Caller-owned description of one submission and its files
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionRef {
    /// Owner's display name (e.g. "Ada Lovelace")
    pub owner_display_name: String,
    /// Owner's identifier, usually an email address
    pub owner_identifier: String,
    /// Stored files, possibly empty
    pub files: Vec<SubmissionFile>,
}

/// A single `(submission, file)` pair scheduled for export
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    /// Storage key of the file
    pub file_key: StoredObjectKey,
    /// Display name of the file
    pub file_name: String,
    /// Owner's display name
    pub student_name: String,
    /// Owner's identifier
    pub student_email: String,
}

impl ExportFile {
    /// Flatten submissions into export files, preserving submission order
    pub fn flatten(submissions: &[SubmissionRef]) -> Vec<ExportFile> {
        submissions
            .iter()
            .flat_map(|submission| {
                submission.files.iter().map(move |file| ExportFile {
                    file_key: file.key.clone(),
                    file_name: file.display_name.clone(),
                    student_name: submission.owner_display_name.clone(),
                    student_email: submission.owner_identifier.clone(),
                })
            })
            .collect()
    }
}

/// Progress of one bulk export run
///
/// Events are emitted in phase order `Preparing → Downloading → Archiving →
/// Complete`; `Failed` may follow any phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Export accepted, nothing fetched yet
    Preparing,

    /// A file was added to the archive
    Downloading {
        /// Zero-based index of the batch being processed
        batch_index: usize,
        /// Number of batches in the run
        total_batches: usize,
        /// Files packaged so far
        files_done: usize,
        /// Files in the run
        total_files: usize,
        /// Name of the file just packaged
        #[serde(skip_serializing_if = "Option::is_none")]
        current_file_name: Option<String>,
    },

    /// Archive serialization progress
    Archiving {
        /// Completion percentage (0 to 100)
        percent: u8,
    },

    /// Archive ready
    Complete {
        /// Files packaged
        files_done: usize,
        /// Files in the run
        total_files: usize,
    },

    /// Run aborted
    Failed {
        /// Human-readable failure
        message: String,
    },
}

impl ProgressEvent {
    /// Ordinal of the phase; `None` for `Failed`, which may follow any phase
    pub fn phase_rank(&self) -> Option<u8> {
        match self {
            ProgressEvent::Preparing => Some(0),
            ProgressEvent::Downloading { .. } => Some(1),
            ProgressEvent::Archiving { .. } => Some(2),
            ProgressEvent::Complete { .. } => Some(3),
            ProgressEvent::Failed { .. } => None,
        }
    }

    /// Whether no further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Complete { .. } | ProgressEvent::Failed { .. }
        )
    }
}

/// Serialized archive produced by a completed export
#[derive(Clone, Debug)]
pub struct ExportArchive {
    /// Zip bytes
    pub bytes: Bytes,
    /// Files packaged into the archive
    pub files_done: usize,
    /// Files the run attempted
    pub total_files: usize,
    /// Files skipped because the proxy could not serve them
    pub skipped: usize,
}

/// How a bulk export run ended, short of failing
#[derive(Clone, Debug)]
pub enum ExportOutcome {
    /// Archive produced (possibly with skipped files)
    Completed(ExportArchive),
    /// Caller cancelled; no partial archive is returned
    Cancelled {
        /// Files packaged before cancellation was observed
        files_done: usize,
        /// Files in the run
        total_files: usize,
    },
}

impl ExportOutcome {
    /// Whether the run was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportOutcome::Cancelled { .. })
    }

    /// Archive of a completed run
    pub fn archive(&self) -> Option<&ExportArchive> {
        match self {
            ExportOutcome::Completed(archive) => Some(archive),
            ExportOutcome::Cancelled { .. } => None,
        }
    }
}

/// Position of one page within a bulk listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfo {
    /// Zero-based page index
    #[serde(default)]
    pub index: usize,
    /// Requested page size
    #[serde(default)]
    pub size: usize,
    /// Files across all pages
    pub total: usize,
    /// Number of pages at this size
    #[serde(default)]
    pub total_batches: usize,
}

/// One page of the bulk listing (`GET /bulk-download?batch=&batchSize=`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BulkListing {
    /// Page position and totals
    pub batch: BatchInfo,
    /// Files on this page
    pub files: Vec<ExportFile>,
}

impl BulkListing {
    /// Slice page `index` of `size` files out of a flattened file list
    pub fn page(files: &[ExportFile], index: usize, size: usize) -> Self {
        let size = size.max(1);
        let start = index.saturating_mul(size).min(files.len());
        let end = start.saturating_add(size).min(files.len());
        Self {
            batch: BatchInfo {
                index,
                size,
                total: files.len(),
                total_batches: files.len().div_ceil(size),
            },
            files: files[start..end].to_vec(),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn submission(name: &str, email: &str, files: &[&str]) -> SubmissionRef {
        SubmissionRef {
            owner_display_name: name.to_string(),
            owner_identifier: email.to_string(),
            files: files
                .iter()
                .map(|f| SubmissionFile {
                    key: StoredObjectKey::new(format!("submissions/{f}")),
                    display_name: f.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn authorization_expiry_is_exclusive() {
        let now = Utc::now();
        let auth = Authorization {
            token: "t".into(),
            api_url: Url::parse("https://api.example.com").unwrap(),
            download_url: Url::parse("https://f.example.com").unwrap(),
            expires_at: now + Duration::hours(23),
        };

        assert!(auth.is_valid_at(now));
        assert!(!auth.is_valid_at(auth.expires_at));
    }

    #[test]
    fn flatten_skips_empty_submissions_and_keeps_order() {
        let subs = vec![
            submission("Ada", "ada@example.com", &["a1.txt", "a2.txt"]),
            submission("Bob", "bob@example.com", &[]),
            submission("Cy", "cy@example.com", &["c1.txt"]),
        ];

        let files = ExportFile::flatten(&subs);
        let names: Vec<_> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a1.txt", "a2.txt", "c1.txt"]);
        assert_eq!(files[2].student_email, "cy@example.com");
    }

    #[test]
    fn progress_event_serializes_with_phase_tag() {
        let event = ProgressEvent::Downloading {
            batch_index: 1,
            total_batches: 3,
            files_done: 4,
            total_files: 9,
            current_file_name: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["phase"], "downloading");
        assert_eq!(json["files_done"], 4);
        assert!(json.get("current_file_name").is_none());
    }

    #[test]
    fn phase_ranks_are_ordered() {
        let ranks: Vec<_> = [
            ProgressEvent::Preparing,
            ProgressEvent::Downloading {
                batch_index: 0,
                total_batches: 1,
                files_done: 1,
                total_files: 1,
                current_file_name: None,
            },
            ProgressEvent::Archiving { percent: 0 },
            ProgressEvent::Complete {
                files_done: 1,
                total_files: 1,
            },
        ]
        .iter()
        .map(|e| e.phase_rank().unwrap())
        .collect();

        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            ProgressEvent::Failed {
                message: "x".into()
            }
            .phase_rank(),
            None
        );
    }

    #[test]
    fn export_file_wire_format_is_camel_case() {
        let json = r#"{"fileKey":"k/1","fileName":"a.txt","studentName":"Ada","studentEmail":"ada@example.com"}"#;
        let file: ExportFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.file_key.as_str(), "k/1");
        assert_eq!(file.student_name, "Ada");
    }

    #[test]
    fn bulk_listing_pages_cover_all_files() {
        let subs = vec![
            submission("Ada", "ada@example.com", &["a1", "a2"]),
            submission("Cy", "cy@example.com", &["c1", "c2", "c3"]),
        ];
        let files = ExportFile::flatten(&subs);

        let last = BulkListing::page(&files, 2, 2);
        assert_eq!(last.batch.total, 5);
        assert_eq!(last.batch.total_batches, 3);
        assert_eq!(last.files.len(), 1);
        assert_eq!(last.files[0].file_name, "c3");

        assert!(BulkListing::page(&files, 9, 2).files.is_empty());
    }

    #[test]
    fn bulk_listing_accepts_minimal_batch_info() {
        let json = r#"{"batch":{"total":0},"files":[]}"#;
        let listing: BulkListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.batch.total, 0);
        assert_eq!(listing.batch.total_batches, 0);
    }
}
