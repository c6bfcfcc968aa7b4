//! HTTP API tests.
//!
//! Drives the router with `tower::ServiceExt::oneshot` against an
//! in-memory inventory and the sample discovery dataset.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use netsync_daemon::api::{AppState, DISCOVER_PATH, HEALTH_PATH, router};
use netsync_reconciler::{DiscoverySource, InjectedFailure, MemoryInventory, ReconciliationEngine};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const DATASET: &str = include_str!("../../data/discovery.json");

fn app(inventory: MemoryInventory) -> (Router, Arc<AppState<MemoryInventory>>) {
    let discovery = DiscoverySource::from_json(DATASET).expect("sample dataset should load");
    let engine = ReconciliationEngine::new(Arc::new(inventory), Arc::new(discovery), 4);
    let state = Arc::new(AppState::new(engine, 256));
    (router(Arc::clone(&state)), state)
}

async fn post_discover(app: &Router, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(DISCOVER_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_discover_cidr_returns_report() {
    // Given: an empty in-memory inventory
    let (app, _state) = app(MemoryInventory::new());

    // When: scanning the sample /29
    let (status, body) = post_discover(&app, json!({ "cidr": "192.168.1.0/29" })).await;

    // Then: every discoverable address is created, the rest skipped
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scanned"].as_array().unwrap().len(), 8);
    assert_eq!(body["created"].as_array().unwrap().len(), 4);
    assert_eq!(body["created"][0]["ip"], "192.168.1.1");
    assert_eq!(body["created"][0]["device"], "core-sw1");
    assert_eq!(body["skipped"][0]["ip"], "192.168.1.0");
    assert_eq!(body["skipped"][0]["reason"], "no discovery data");
    assert_eq!(body["mode"], "memory");
    assert!(body.get("partial").is_none());
}

#[tokio::test]
async fn test_discover_is_idempotent() {
    let (app, _state) = app(MemoryInventory::new());
    let request = json!({ "ips": ["192.168.1.1", "192.168.1.2"] });

    let (_, first) = post_discover(&app, request.clone()).await;
    assert_eq!(first["created"].as_array().unwrap().len(), 2);

    let (status, second) = post_discover(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(second["created"].as_array().unwrap().is_empty());
    assert_eq!(second["skipped"][0]["reason"], "already up to date");
    assert_eq!(second["skipped"][1]["reason"], "already up to date");
}

#[tokio::test]
async fn test_invalid_cidr_is_rejected_before_lookup() {
    let (app, state) = app(MemoryInventory::new());

    let (status, body) = post_discover(&app, json!({ "cidr": "192.168.1.0/33" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidCIDR");
    assert!(body["message"].as_str().unwrap().contains("192.168.1.0/33"));
    assert_eq!(state.engine().discovery().lookup_count(), 0);
}

#[tokio::test]
async fn test_invalid_address_is_rejected() {
    let (app, _state) = app(MemoryInventory::new());
    let (status, body) = post_discover(&app, json!({ "ips": ["192.168.1.1", "not-an-ip"] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidAddress");
}

#[tokio::test]
async fn test_oversized_range_is_rejected() {
    let (app, _state) = app(MemoryInventory::new());
    let (status, body) = post_discover(&app, json!({ "cidr": "10.0.0.0/16" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "RangeTooLarge");
}

#[tokio::test]
async fn test_empty_request_has_no_targets() {
    let (app, _state) = app(MemoryInventory::new());
    let (status, body) = post_discover(&app, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NoTargets");
}

#[tokio::test]
async fn test_bad_name_prefix_is_rejected() {
    let (app, _state) = app(MemoryInventory::new());
    let (status, body) = post_discover(
        &app,
        json!({ "ips": ["192.168.1.1"], "name_prefix": "lab prefix" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidNamePrefix");
}

#[tokio::test]
async fn test_malformed_json_body() {
    let (app, _state) = app(MemoryInventory::new());
    let request = Request::builder()
        .method("POST")
        .uri(DISCOVER_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"cidr\": "))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert!(status.is_client_error());
    assert_eq!(body["error"], "InvalidRequest");
}

#[tokio::test]
async fn test_target_failure_keeps_status_ok() {
    // Given: the inventory times out for one device
    let inventory = MemoryInventory::new().with_device_failure("access-sw2", InjectedFailure::Timeout);
    let (app, _state) = app(inventory);

    // When
    let (status, body) = post_discover(
        &app,
        json!({ "ips": ["192.168.1.1", "192.168.1.2", "192.168.1.3"] }),
    )
    .await;

    // Then: the failure is a report entry, siblings still succeed
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"][0]["ip"], "192.168.1.2");
    assert_eq!(body["created"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_shutdown_yields_partial_report() {
    let discovery = DiscoverySource::from_json(DATASET).unwrap();
    let engine = ReconciliationEngine::new(Arc::new(MemoryInventory::new()), Arc::new(discovery), 4);
    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState::new(engine, 256).with_shutdown(shutdown.clone()));
    let app = router(state);

    shutdown.cancel();
    let (status, body) = post_discover(&app, json!({ "cidr": "192.168.1.0/29" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["partial"], true);
    assert!(body["scanned"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_health_reports_mode_and_dataset() {
    let (app, _state) = app(MemoryInventory::new());
    let request = Request::builder()
        .uri(HEALTH_PATH)
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mode"], "memory");
    assert_eq!(body["dataset_entries"], 4);
    assert!(body["uptime_secs"].is_u64());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _state) = app(MemoryInventory::new());
    let request = Request::builder()
        .uri("/api/v/unknown")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
