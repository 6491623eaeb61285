// ABOUTME: HTTP-level tests for /getaccess and /health against the real router and a fake runtime

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

use common::{FakeRuntime, ALPINE_ID, API_KEY, SECRET};
use shell_gateway::api::{router, AppState};
use shell_gateway::token::TokenCodec;

fn app() -> (axum::Router, AppState) {
    let state = AppState::with_memory_store(&common::test_config(), Arc::new(FakeRuntime::new()));
    (router(state.clone()), state)
}

async fn get(app: axum::Router, uri: &str, api_key: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri).header("host", "localhost:8080");
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }
    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_access_granted_for_running_container() {
    let (app, state) = app();

    let (status, json) = get(app, "/getaccess?containerName=test-alpine", Some(API_KEY)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let data = &json["data"];
    assert_eq!(data["containerName"], "test-alpine");
    assert_eq!(data["containerId"], ALPINE_ID);
    assert_eq!(data["expiresIn"], 300);

    let token = data["token"].as_str().unwrap();
    assert_eq!(
        data["url"].as_str().unwrap(),
        format!("ws://localhost:8080/terminal?token={token}")
    );

    let claims = TokenCodec::new(SECRET.as_bytes()).verify(token).unwrap();
    assert_eq!(claims.session_id.to_string(), data["sessionId"].as_str().unwrap());
    assert!(state.sessions.get(&claims.session_id).await.is_some());
}

#[tokio::test]
async fn test_access_by_id_prefix() {
    let (app, _) = app();
    let (status, json) = get(app, "/getaccess?containerName=4f1c", Some(API_KEY)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["containerId"], ALPINE_ID);
}

#[tokio::test]
async fn test_missing_container_name_is_bad_request() {
    let (app, _) = app();
    let (status, json) = get(app, "/getaccess", Some(API_KEY)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("containerName"));
}

#[tokio::test]
async fn test_unknown_container_is_not_found() {
    let (app, state) = app();
    let (status, json) = get(app, "/getaccess?containerName=ghost", Some(API_KEY)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(state.sessions.len().await, 0);
}

#[tokio::test]
async fn test_stopped_container_is_refused() {
    let (app, state) = app();
    let (status, json) = get(app, "/getaccess?containerName=stopped-db", Some(API_KEY)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Container is not running: stopped-db");
    assert_eq!(state.sessions.len().await, 0);
}

#[tokio::test]
async fn test_api_key_required() {
    let (app, _) = app();
    let (status, json) = get(app, "/getaccess?containerName=test-alpine", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);

    let (app, _) = self::app();
    let (status, _) = get(app, "/getaccess?containerName=test-alpine", Some("wrong")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_health_reports_active_sessions() {
    let (app, state) = app();
    state.authority.request_access("test-alpine").await.unwrap();

    let (status, json) = get(app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["activeSessions"], 1);
}
