use super::*;
use crate::storage::tests::{mock_client, mount_authorize};
use crate::types::{StoredObjectKey, SubmissionFile, SubmissionRef};
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use tower::ServiceExt;
use wiremock::MockServer;

mod system;

/// Three submissions with 2, 0 and 3 files
fn coursework() -> Vec<SubmissionRef> {
    let submission = |name: &str, email: &str, files: &[&str]| SubmissionRef {
        owner_display_name: name.to_string(),
        owner_identifier: email.to_string(),
        files: files
            .iter()
            .map(|f| SubmissionFile {
                key: StoredObjectKey::new(format!("submissions/{f}")),
                display_name: f.to_string(),
            })
            .collect(),
    };
    vec![
        submission("Ada Lovelace", "ada@example.org", &["a1.pdf", "a2.pdf"]),
        submission("Bob", "bob@example.org", &[]),
        submission("Cy Young", "cy@example.org", &["c1.pdf", "c2.pdf", "c3.pdf"]),
    ]
}

/// Router backed by `server` acting as the storage backend
async fn test_router(server: &MockServer, config: Config) -> Router {
    mount_authorize(server).await;
    let storage = mock_client(server).await;
    create_router(
        storage,
        Arc::new(StaticCatalog::new(coursework())),
        Arc::new(config),
    )
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let server = MockServer::start().await;
    let storage = mock_client(&server).await;

    let mut config = Config::default();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();

    let handle = tokio::spawn(start_api_server(
        storage,
        Arc::new(StaticCatalog::default()),
        Arc::new(config),
    ));

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!handle.is_finished(), "server should still be running");
    handle.abort();
}

#[tokio::test]
async fn test_cors_enabled_adds_headers() {
    let server = MockServer::start().await;
    let app = test_router(&server, Config::default()).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_disabled_omits_headers() {
    let server = MockServer::start().await;
    let mut config = Config::default();
    config.api.cors_enabled = false;
    let app = test_router(&server, config).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origin_is_echoed() {
    let server = MockServer::start().await;
    let mut config = Config::default();
    config.api.cors_origins = vec!["https://app.example.org".to_string()];
    let app = test_router(&server, config).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://app.example.org")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://app.example.org"
    );
}
