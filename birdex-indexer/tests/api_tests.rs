//! HTTP API integration tests
//!
//! Requests go through the full router via `tower::ServiceExt::oneshot`.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use birdex_common::config::TomlConfig;
use birdex_common::events::{EventBus, IndexEvent};
use birdex_indexer::models::ScanSession;
use birdex_indexer::services::PhotoRegistry;
use birdex_indexer::{build_router, AppState};
use helpers::{catalog_json, grey_heron, house_sparrow, registry_with, touch_all};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

fn test_state(registry: Arc<PhotoRegistry>) -> AppState {
    AppState::new(registry, EventBus::new(100), &TomlConfig::default())
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Poll /api/status until the session leaves "scanning"
async fn wait_for_completion(state: &AppState) -> Value {
    for _ in 0..200 {
        let (_, status) = send(state, get("/api/status")).await;
        if status["status"] == "completed" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scan did not complete in time");
}

#[tokio::test]
async fn health_reports_catalog_and_photo_counts() {
    let state = test_state(registry_with(vec![house_sparrow(), grey_heron()]));
    let (status, body) = send(&state, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "birdex-indexer");
    assert_eq!(body["species"], 2);
    assert_eq!(body["photos"], 0);
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn health_is_degraded_without_catalog() {
    let state = test_state(Arc::new(PhotoRegistry::default()));
    let (_, body) = send(&state, get("/health")).await;
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn status_is_idle_before_first_scan() {
    let state = test_state(registry_with(vec![house_sparrow()]));
    let (status, body) = send(&state, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "idle", "scanned": 0, "matched": 0}));
}

#[tokio::test]
async fn scan_runs_in_background_and_fills_tree() {
    let dir = TempDir::new().unwrap();
    touch_all(dir.path(), &["House_Sparrow_001.jpg", "unknown_bird.png"]);
    let state = test_state(registry_with(vec![house_sparrow()]));

    let (status, body) = send(
        &state,
        post_json("/api/scan", json!({"paths": [dir.path().to_string_lossy()]})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "scanning");
    assert!(body["session_id"].is_string());

    let final_status = wait_for_completion(&state).await;
    assert_eq!(final_status["scanned"], 2);
    assert_eq!(final_status["matched"], 1);

    let (status, tree) = send(&state, get("/api/tree")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree["id"], "Root-World_Birds");
    assert_eq!(tree["label"], "World Birds (1)");
    assert_eq!(tree["rank"], "Root");
    let species = &tree["children"][0]["children"][0]["children"][0]["children"][0];
    assert_eq!(species["rank"], "Species");
    assert_eq!(species["photocount"], 1);
    assert_eq!(species["photo"][0]["name"], "House_Sparrow_001.jpg");
}

#[tokio::test]
async fn scan_without_paths_is_rejected() {
    let state = test_state(registry_with(vec![house_sparrow()]));
    let (status, body) = send(&state, post_json("/api/scan", json!({"paths": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send(&state, post_json("/api/scan", json!({"paths": ["  "]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_scan_while_running_conflicts() {
    let state = test_state(registry_with(vec![house_sparrow()]));
    *state.session.write() = Some(ScanSession::start(vec!["/photos".to_string()]));

    let (status, body) = send(&state, post_json("/api/scan", json!({"paths": ["/other"]}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn cancel_without_running_scan_is_not_found() {
    let state = test_state(registry_with(vec![house_sparrow()]));
    let (status, body) = send(&state, post_json("/api/scan/cancel", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn missing_root_completes_with_zero_counts() {
    let state = test_state(registry_with(vec![house_sparrow()]));
    let (status, _) = send(
        &state,
        post_json("/api/scan", json!({"paths": ["/nonexistent/birdex/photos"]})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let final_status = wait_for_completion(&state).await;
    assert_eq!(final_status["scanned"], 0);
    assert_eq!(final_status["matched"], 0);
}

#[tokio::test]
async fn reset_clears_previous_photos() {
    let dir = TempDir::new().unwrap();
    touch_all(dir.path(), &["House_Sparrow_001.jpg"]);
    let state = test_state(registry_with(vec![house_sparrow()]));
    let path = dir.path().to_string_lossy().to_string();

    send(&state, post_json("/api/scan", json!({"paths": [path]}))).await;
    wait_for_completion(&state).await;
    send(&state, post_json("/api/scan", json!({"paths": [path]}))).await;
    wait_for_completion(&state).await;
    assert_eq!(state.registry.photo_count(), 2);

    send(&state, post_json("/api/scan", json!({"paths": [path], "reset": true}))).await;
    wait_for_completion(&state).await;
    assert_eq!(state.registry.photo_count(), 1);
}

#[tokio::test]
async fn scan_events_are_published() {
    let dir = TempDir::new().unwrap();
    touch_all(dir.path(), &["House_Sparrow_001.jpg"]);
    let state = test_state(registry_with(vec![house_sparrow()]));
    let mut rx = state.event_bus.subscribe();

    send(
        &state,
        post_json("/api/scan", json!({"paths": [dir.path().to_string_lossy()]})),
    )
    .await;

    let mut types = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event in time")
            .unwrap();
        types.push(event.event_type());
        if let IndexEvent::ScanCompleted { scanned, matched, cancelled, .. } = event {
            assert_eq!((scanned, matched, cancelled), (1, 1, false));
            break;
        }
    }
    assert_eq!(types.first(), Some(&"ScanStarted"));
    assert!(types.contains(&"ScanProgress"));
    assert_eq!(types.last(), Some(&"ScanCompleted"));
}

#[tokio::test]
async fn catalog_reload_reads_configured_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, catalog_json(&[house_sparrow(), grey_heron()])).unwrap();

    let config = TomlConfig {
        catalog_path: Some(path),
        ..TomlConfig::default()
    };
    let state = AppState::new(Arc::new(PhotoRegistry::default()), EventBus::new(100), &config);

    let (_, before) = send(&state, get("/api/catalog")).await;
    assert_eq!(before["species"], 0);

    let (status, after) = send(&state, post_json("/api/catalog/reload", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["species"], 2);
    assert_eq!(after["keys"], 4);
    assert_eq!(after["collisions"], 0);
}

#[tokio::test]
async fn catalog_reload_without_path_is_rejected() {
    let state = test_state(registry_with(vec![house_sparrow()]));
    let (status, _) = send(&state, post_json("/api/catalog/reload", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn catalog_reload_refused_while_scan_running() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, catalog_json(&[grey_heron()])).unwrap();
    let config = TomlConfig {
        catalog_path: Some(path),
        ..TomlConfig::default()
    };
    let state = AppState::new(registry_with(vec![house_sparrow()]), EventBus::new(100), &config);
    *state.session.write() = Some(ScanSession::start(vec!["/photos".to_string()]));

    let (status, body) = send(&state, post_json("/api/catalog/reload", json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert!(!state.catalog_reloading());
    assert!(state.registry.catalog().contains("Passer domesticus"));
}

#[tokio::test]
async fn scan_refused_while_catalog_reload_in_progress() {
    let dir = TempDir::new().unwrap();
    touch_all(dir.path(), &["House_Sparrow_001.jpg"]);
    let state = test_state(registry_with(vec![house_sparrow()]));
    let path = dir.path().to_string_lossy().to_string();

    let claim = state.begin_catalog_reload().unwrap();
    let (status, body) = send(&state, post_json("/api/scan", json!({"paths": [path]}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(send(&state, get("/api/status")).await.1["status"], "idle");

    drop(claim);
    assert!(!state.catalog_reloading());
    let (status, _) = send(&state, post_json("/api/scan", json!({"paths": [path]}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(wait_for_completion(&state).await["matched"], 1);
}

#[tokio::test]
async fn catalog_reload_releases_claim_after_failure() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig {
        catalog_path: Some(dir.path().join("absent.json")),
        ..TomlConfig::default()
    };
    let state = AppState::new(registry_with(vec![house_sparrow()]), EventBus::new(100), &config);

    let (status, _) = send(&state, post_json("/api/catalog/reload", json!({}))).await;
    assert!(status.is_client_error() || status.is_server_error());
    assert!(!state.catalog_reloading());
}

#[tokio::test]
async fn cancel_right_after_start_reaches_the_scan() {
    let dir = TempDir::new().unwrap();
    let names: Vec<String> = (0..300).map(|i| format!("House_Sparrow_{:03}.jpg", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    touch_all(dir.path(), &names);
    let state = test_state(registry_with(vec![house_sparrow()]));

    let (status, started) = send(
        &state,
        post_json("/api/scan", json!({"paths": [dir.path().to_string_lossy()]})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, cancelled) = send(&state, post_json("/api/scan/cancel", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["session_id"], started["session_id"]);

    wait_for_completion(&state).await;
    assert!(state.cancel_token.read().is_none());
    let (status, _) = send(&state, post_json("/api/scan/cancel", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let state = test_state(registry_with(vec![house_sparrow()]));
    let (status, _) = send(&state, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
