//! Common test utilities for b2-vault integration tests
//!
//! [`FakeB2`] is a wiremock server speaking enough of the native B2 API to
//! store uploads in memory and serve them back through signed download URLs.

#![allow(dead_code)]

use b2_vault::types::{StoredObjectKey, SubmissionFile, SubmissionRef};
use b2_vault::{RetryConfig, StorageClient, StorageConfig};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Bucket name the fake serves downloads under
pub const BUCKET_NAME: &str = "coursework";

/// Stored objects by key: (file id, content)
type ObjectMap = Arc<Mutex<BTreeMap<String, (String, Vec<u8>)>>>;

/// In-memory stand-in for the storage backend
pub struct FakeB2 {
    /// The underlying mock server (mount extra mocks with a higher priority)
    pub server: MockServer,
    objects: ObjectMap,
    authorize_calls: Arc<AtomicUsize>,
}

impl FakeB2 {
    /// Start a fake backend with every endpoint mounted
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let fake = Self {
            server,
            objects: Arc::default(),
            authorize_calls: Arc::default(),
        };
        fake.mount().await;
        fake
    }

    /// Storage settings pointing at the fake
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            key_id: "key-id".into(),
            application_key: "app-key".into(),
            bucket_id: "bucket-id".into(),
            bucket_name: BUCKET_NAME.into(),
            auth_root: format!("{}/b2api/v2", self.server.uri()),
            ..Default::default()
        }
    }

    /// Client with fast retries against the fake
    pub fn client(&self) -> StorageClient {
        StorageClient::new(self.storage_config(), fast_retry()).unwrap()
    }

    /// Store an object directly, bypassing the upload flow
    pub fn put(&self, key: &str, content: &[u8]) {
        let id = format!("seeded-{key}");
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (id, content.to_vec()));
    }

    /// Content stored under `key`
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, content)| content.clone())
    }

    /// How many times `b2_authorize_account` was called
    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    async fn mount(&self) {
        let uri = self.server.uri();

        let calls = self.authorize_calls.clone();
        let base = uri.clone();
        Mock::given(method("GET"))
            .and(path("/b2api/v2/b2_authorize_account"))
            .respond_with(move |_: &Request| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "accountId": "acct",
                    "authorizationToken": format!("acct-{n}"),
                    "apiUrl": base,
                    "downloadUrl": base,
                }))
            })
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/b2api/v2/b2_get_upload_url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "bucketId": "bucket-id",
                "uploadUrl": format!("{uri}/upload/bucket-id"),
                "authorizationToken": "upload-token"
            })))
            .mount(&self.server)
            .await;

        let objects = self.objects.clone();
        let uploads = Arc::new(AtomicUsize::new(0));
        Mock::given(method("POST"))
            .and(path("/upload/bucket-id"))
            .respond_with(move |request: &Request| {
                let header = |name: &str| {
                    request
                        .headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                };
                let key = urlencoding::decode(&header("x-bz-file-name"))
                    .map(|k| k.into_owned())
                    .unwrap_or_default();
                let file_id = format!("file-{}", uploads.fetch_add(1, Ordering::SeqCst));
                objects
                    .lock()
                    .unwrap()
                    .insert(key.clone(), (file_id.clone(), request.body.clone()));
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "fileId": file_id,
                    "fileName": key,
                    "contentLength": request.body.len(),
                    "contentSha1": header("x-bz-content-sha1"),
                }))
            })
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/b2api/v2/b2_get_download_authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "authorizationToken": "download-token"
            })))
            .mount(&self.server)
            .await;

        let objects = self.objects.clone();
        Mock::given(method("GET"))
            .and(path_regex(format!("^/file/{BUCKET_NAME}/.+")))
            .respond_with(move |request: &Request| {
                let encoded = request
                    .url
                    .path()
                    .trim_start_matches(&format!("/file/{BUCKET_NAME}/"))
                    .to_string();
                let key = urlencoding::decode(&encoded)
                    .map(|k| k.into_owned())
                    .unwrap_or_default();
                match objects.lock().unwrap().get(&key) {
                    Some((_, content)) => {
                        ResponseTemplate::new(200).set_body_bytes(content.clone())
                    }
                    None => ResponseTemplate::new(404).set_body_json(serde_json::json!({
                        "status": 404,
                        "code": "not_found",
                        "message": format!("file not present: {key}")
                    })),
                }
            })
            .mount(&self.server)
            .await;

        let objects = self.objects.clone();
        Mock::given(method("POST"))
            .and(path("/b2api/v2/b2_list_file_names"))
            .respond_with(move |request: &Request| {
                let body: serde_json::Value =
                    serde_json::from_slice(&request.body).unwrap_or_default();
                let prefix = body["prefix"].as_str().unwrap_or_default().to_string();
                let max = body["maxFileCount"].as_u64().unwrap_or(100) as usize;
                let files: Vec<_> = objects
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|(name, _)| name.starts_with(&prefix))
                    .take(max)
                    .map(|(name, (id, content))| {
                        serde_json::json!({
                            "fileId": id,
                            "fileName": name,
                            "contentLength": content.len(),
                        })
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": files }))
            })
            .mount(&self.server)
            .await;

        let objects = self.objects.clone();
        Mock::given(method("POST"))
            .and(path("/b2api/v2/b2_delete_file_version"))
            .respond_with(move |request: &Request| {
                let body: serde_json::Value =
                    serde_json::from_slice(&request.body).unwrap_or_default();
                let name = body["fileName"].as_str().unwrap_or_default().to_string();
                let id = body["fileId"].as_str().unwrap_or_default();

                let mut objects = objects.lock().unwrap();
                match objects.get(&name) {
                    Some((stored_id, _)) if stored_id == id => {
                        objects.remove(&name);
                        ResponseTemplate::new(200).set_body_json(serde_json::json!({
                            "fileId": id,
                            "fileName": name,
                        }))
                    }
                    _ => ResponseTemplate::new(400).set_body_json(serde_json::json!({
                        "status": 400,
                        "code": "file_not_present",
                        "message": format!("file not present: {name}")
                    })),
                }
            })
            .mount(&self.server)
            .await;
    }
}

/// Retry policy with millisecond delays
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 4,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

/// Build a submission whose files live under `submissions/<name>`
pub fn submission(name: &str, email: &str, files: &[&str]) -> SubmissionRef {
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

/// Three submissions with 2, 0 and 3 files
pub fn coursework() -> Vec<SubmissionRef> {
    vec![
        submission("Ada Lovelace", "ada@example.org", &["a1.pdf", "a2.pdf"]),
        submission("Bob", "bob@example.org", &[]),
        submission("Cy Young", "cy@example.org", &["c1.pdf", "c2.pdf", "c3.pdf"]),
    ]
}

/// Seed `fake` with content for every file of `submissions`
pub fn seed(fake: &FakeB2, submissions: &[SubmissionRef]) {
    for file in submissions.iter().flat_map(|s| &s.files) {
        fake.put(
            file.key.as_str(),
            format!("content of {}", file.display_name).as_bytes(),
        );
    }
}
