//! Request and response bodies of the B2 native API.

use serde::{Deserialize, Serialize};

/// `b2_authorize_account` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorizeAccountResponse {
    pub(crate) authorization_token: String,
    pub(crate) api_url: String,
    pub(crate) download_url: String,
}

/// `b2_get_upload_url` request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetUploadUrlRequest<'a> {
    pub(crate) bucket_id: &'a str,
}

/// `b2_get_upload_url` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetUploadUrlResponse {
    pub(crate) upload_url: String,
    pub(crate) authorization_token: String,
}

/// `b2_upload_file` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadFileResponse {
    pub(crate) file_id: String,
    pub(crate) file_name: String,
    pub(crate) content_length: u64,
    pub(crate) content_sha1: String,
}

/// `b2_get_download_authorization` request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetDownloadAuthorizationRequest<'a> {
    pub(crate) bucket_id: &'a str,
    pub(crate) file_name_prefix: &'a str,
    pub(crate) valid_duration_in_seconds: u64,
}

/// `b2_get_download_authorization` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetDownloadAuthorizationResponse {
    pub(crate) authorization_token: String,
}

/// `b2_list_file_names` request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListFileNamesRequest<'a> {
    pub(crate) bucket_id: &'a str,
    pub(crate) prefix: &'a str,
    pub(crate) max_file_count: u32,
}

/// `b2_list_file_names` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListFileNamesResponse {
    #[serde(default)]
    pub(crate) files: Vec<ListedFile>,
}

/// One entry of a file listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedFile {
    /// Backend file version id
    pub file_id: String,
    /// Full object key
    pub file_name: String,
    /// Size in bytes
    #[serde(default)]
    pub content_length: u64,
}

/// `b2_delete_file_version` request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteFileVersionRequest<'a> {
    pub(crate) file_id: &'a str,
    pub(crate) file_name: &'a str,
}

/// Error body returned on every non-2xx reply
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) code: String,
    #[serde(default)]
    pub(crate) message: String,
}
