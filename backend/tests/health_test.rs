//! Integration tests for health check endpoints

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_health_endpoint() {
    let app = common::TestApp::in_memory();

    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "healthy");
}

#[tokio::test]
async fn test_liveness_endpoint() {
    let app = common::TestApp::in_memory();

    let response = app.get("/health/live").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("alive"));
}

#[tokio::test]
async fn test_readiness_reports_both_stores() {
    let app = common::TestApp::in_memory();

    let response = app.get("/health/ready").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["database"]["status"], "healthy");
    assert_eq!(body["checks"]["revocation_store"]["status"], "healthy");
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_readiness_with_database() {
    let app = common::TestApp::with_database().await;

    let response = app.get("/health/ready").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("ready"));
}
