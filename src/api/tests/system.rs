use super::*;

#[tokio::test]
async fn test_health_check_reports_ok() {
    let server = MockServer::start().await;
    let app = test_router(&server, Config::default()).await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_spec_is_served() {
    let server = MockServer::start().await;
    let app = test_router(&server, Config::default()).await;

    let request = Request::builder()
        .uri("/openapi.json")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["paths"]["/bulk-download"].is_object());
    assert!(json["paths"]["/download/{key}"].is_object());
}
