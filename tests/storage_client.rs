//! Storage client against an in-memory backend
//!
//! These tests verify:
//! - Uploaded bytes come back unchanged through a signed download URL
//! - A token rejected once is refreshed exactly once and the call still succeeds
//! - Concurrent callers share a single authorization
//! - Invalid uploads never reach the network
//! - Deleting by key removes the object

mod common;

use b2_vault::{Error, StorageClient, UploadRequest};
use common::FakeB2;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn download(client: &StorageClient, key: &b2_vault::StoredObjectKey) -> Vec<u8> {
    let url = client.signed_download_url(key, 600).await.unwrap();
    let response = reqwest::get(url).await.unwrap();
    assert!(response.status().is_success(), "status {}", response.status());
    response.bytes().await.unwrap().to_vec()
}

#[tokio::test]
async fn upload_then_signed_url_returns_identical_bytes() {
    let fake = FakeB2::start().await;
    let client = fake.client();

    let payloads: Vec<(&str, Vec<u8>)> = vec![
        ("one byte.txt", vec![0x2a]),
        ("notes.txt", b"lecture notes, week 3".to_vec()),
        ("scan.pdf", (0..300_000u32).map(|i| (i % 251) as u8).collect()),
    ];

    for (name, bytes) in payloads {
        let stored = client
            .upload(UploadRequest::new(bytes.clone(), name, "application/octet-stream"))
            .await
            .unwrap();

        assert_eq!(stored.size, bytes.len() as u64);
        assert_eq!(stored.display_name, name);
        assert_eq!(download(&client, &stored.key).await, bytes, "{name}");
    }

    assert_eq!(fake.authorize_calls(), 1);
}

#[tokio::test]
async fn expired_token_is_refreshed_once() {
    let fake = FakeB2::start().await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_get_upload_url"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "status": 401,
            "code": "expired_auth_token",
            "message": "Authorization token has expired"
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&fake.server)
        .await;
    let client = fake.client();

    let stored = client
        .upload(UploadRequest::new(b"essay".to_vec(), "essay.txt", "text/plain"))
        .await
        .unwrap();

    assert_eq!(fake.get(stored.key.as_str()).unwrap(), b"essay");
    assert_eq!(client.credentials().invalidation_count(), 1);
    assert_eq!(client.credentials().refresh_count(), 2);
    assert_eq!(fake.authorize_calls(), 2);
}

#[tokio::test]
async fn concurrent_uploads_share_one_authorization() {
    let fake = FakeB2::start().await;
    let client = fake.client();

    let uploads = (0..8).map(|i| {
        let client = client.clone();
        async move {
            client
                .upload(UploadRequest::new(
                    format!("submission {i}").into_bytes(),
                    format!("s{i}.txt"),
                    "text/plain",
                ))
                .await
        }
    });

    let stored = futures::future::try_join_all(uploads).await.unwrap();

    assert_eq!(stored.len(), 8);
    assert_eq!(fake.authorize_calls(), 1);
    for (i, descriptor) in stored.iter().enumerate() {
        assert_eq!(
            fake.get(descriptor.key.as_str()).unwrap(),
            format!("submission {i}").into_bytes()
        );
    }
}

#[tokio::test]
async fn invalid_upload_makes_no_requests() {
    let fake = FakeB2::start().await;
    let client = fake.client();

    let err = client
        .upload(UploadRequest::new(Vec::new(), "empty.txt", "text/plain"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(fake.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_without_file_id_removes_the_object() {
    let fake = FakeB2::start().await;
    let client = fake.client();

    let stored = client
        .upload(UploadRequest::new(b"draft".to_vec(), "draft.txt", "text/plain").with_category("drafts"))
        .await
        .unwrap();
    assert!(stored.key.as_str().starts_with("drafts/"));

    client.delete(&stored.key, None).await.unwrap();

    assert!(fake.get(stored.key.as_str()).is_none());
    let err = client.fetch_object(&stored.key).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn test_signed_url_ttl_is_bounded_by_backend_maximum() {
    let fake = FakeB2::start().await;
    let client = fake.client();
    fake.put("submissions/week1.pdf", b"week one");
    let key = b2_vault::StoredObjectKey::new("submissions/week1.pdf");

    let url = client
        .signed_download_url(&key, b2_vault::storage::MAX_DOWNLOAD_TTL_SECS)
        .await
        .unwrap();
    assert!(url.as_str().contains("Authorization=download-token"));

    let err = client
        .signed_download_url(&key, b2_vault::storage::MAX_DOWNLOAD_TTL_SECS + 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}
