//! Error types for b2-vault
//!
//! This module provides the error taxonomy shared by the storage client and the
//! bulk export pipeline:
//! - Domain errors (validation, auth, quota, not-found, upload/download failures)
//! - The [`ExportError`] wrapper that records how far a failed export got
//! - HTTP status code mapping and a structured JSON envelope for the API surface

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for b2-vault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for b2-vault
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "export.batch_size")
        key: Option<String>,
    },

    /// Caller supplied input the backend would never accept
    #[error("validation error: {0}")]
    Validation(String),

    /// Could not obtain or refresh backend credentials
    #[error("storage authorization failed: {message}")]
    AuthBackend {
        /// HTTP status returned by the authorize call, if a response arrived
        status: Option<u16>,
        /// Backend or transport message
        message: String,
    },

    /// Backend rejected the token as expired or invalid
    #[error("authorization token rejected by backend ({code})")]
    TokenExpired {
        /// Backend error code, e.g. "expired_auth_token"
        code: String,
    },

    /// Account storage, transaction or bandwidth cap reached
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend answered with an unexpected status
    #[error("backend returned {status} ({code}): {message}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Backend error code
        code: String,
        /// Backend error message
        message: String,
    },

    /// Upload of a named file failed
    #[error("upload of {file_name} failed: {reason}")]
    Upload {
        /// Human-readable file name being uploaded
        file_name: String,
        /// HTTP status, if the backend answered
        status: Option<u16>,
        /// Failure description
        reason: String,
    },

    /// Download of a named file failed
    #[error("download of {file_name} failed: {reason}")]
    Download {
        /// Human-readable file name being downloaded
        file_name: String,
        /// HTTP status, if the server answered
        status: Option<u16>,
        /// Failure description
        reason: String,
    },

    /// Bulk export was asked to package zero files
    #[error("nothing to export: no submission has any files")]
    NothingToExport,

    /// Bulk export aborted
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Archive serialization error
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Whole-run failure of a bulk export
///
/// Always records how many files had been packaged before the failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("export failed after {files_done} of {total_files} files: {message}")]
pub struct ExportError {
    /// Files written to the archive before the failure
    pub files_done: usize,
    /// Files the run intended to package
    pub total_files: usize,
    /// Description of the underlying failure
    pub message: String,
}

/// API error response format
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "not found: uploads/1700000000000-ab12cd-essay.pdf"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,
            Error::NothingToExport => 422,

            Error::NotFound(_) => 404,
            Error::Download {
                status: Some(404), ..
            } => 404,

            // Quota exhaustion is surfaced verbatim to the client
            Error::QuotaExceeded(_) => 507,

            // 502 Bad Gateway - the storage backend misbehaved
            Error::AuthBackend { .. } => 502,
            Error::TokenExpired { .. } => 502,
            Error::Backend { .. } => 502,
            Error::Upload { .. } => 502,
            Error::Download { .. } => 502,
            Error::Network(_) => 502,

            Error::Export(_) => 500,
            Error::Archive(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::AuthBackend { .. } => "auth_backend_error",
            Error::TokenExpired { .. } => "token_expired",
            Error::QuotaExceeded(_) => "quota_exceeded",
            Error::NotFound(_) => "not_found",
            Error::Backend { .. } => "backend_error",
            Error::Upload { .. } => "upload_failed",
            Error::Download { .. } => "download_failed",
            Error::NothingToExport => "nothing_to_export",
            Error::Export(_) => "export_failed",
            Error::Archive(_) => "archive_error",
            Error::Network(_) => "network_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Upload {
                file_name, status, ..
            }
            | Error::Download {
                file_name, status, ..
            } => Some(serde_json::json!({
                "file_name": file_name,
                "status": status,
            })),
            Error::Backend { status, code, .. } => Some(serde_json::json!({
                "backend_status": status,
                "backend_code": code,
            })),
            Error::Export(e) => Some(serde_json::json!({
                "files_done": e.files_done,
                "total_files": e.total_files,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_error_carries_file_name() {
        let err = Error::Upload {
            file_name: "essay final.pdf".to_string(),
            status: Some(400),
            reason: "bad_request".to_string(),
        };
        assert!(err.to_string().contains("essay final.pdf"));

        let api: ApiError = err.into();
        assert_eq!(api.error.code, "upload_failed");
        let details = api.error.details.unwrap();
        assert_eq!(details["file_name"], "essay final.pdf");
    }

    #[test]
    fn export_error_reports_progress_before_failure() {
        let err = Error::from(ExportError {
            files_done: 3,
            total_files: 7,
            message: "archive error".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "export failed after 3 of 7 files: archive error"
        );
        assert_eq!(err.status_code(), 500);

        let api: ApiError = err.into();
        let details = api.error.details.unwrap();
        assert_eq!(details["files_done"], 3);
        assert_eq!(details["total_files"], 7);
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(Error::Validation("empty".into()).status_code(), 400);
        assert_eq!(Error::NotFound("k".into()).status_code(), 404);
        assert_eq!(Error::QuotaExceeded("cap".into()).status_code(), 507);
        assert_eq!(Error::NothingToExport.status_code(), 422);
        assert_eq!(
            Error::Download {
                file_name: "a.txt".into(),
                status: Some(404),
                reason: "missing".into(),
            }
            .status_code(),
            404
        );
        assert_eq!(
            Error::Backend {
                status: 503,
                code: "service_unavailable".into(),
                message: "busy".into(),
            }
            .status_code(),
            502
        );
    }

    #[test]
    fn api_error_omits_empty_details() {
        let api: ApiError = Error::Validation("empty upload".into()).into();
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["error"]["code"], "validation_error");
        assert!(json["error"].get("details").is_none());
    }
}
