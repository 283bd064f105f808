//! Backend API Integration Tests
//!
//! Tests for the Axum HTTP endpoints using Router::oneshot pattern.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use backend::api::{self, AppState};
use backend::archive::Archive;
use backend::bot::FirstLegal;
use backend::directory::DirectorySettings;
use backend::rating::EloTable;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use web_time::Instant;

/// Helper to create test router backed by an in-memory archive
async fn test_state() -> AppState {
    let archive = Archive::in_memory()
        .await
        .expect("Failed to create test archive");
    AppState::with_collaborators(
        DirectorySettings::default(),
        archive,
        Arc::new(EloTable::new()),
        Arc::new(FirstLegal),
    )
}

async fn test_router() -> Router {
    api::router(test_state().await)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create(app: &Router, body: Value) -> String {
    let (status, snapshot) = call(app, "POST", "/api/games", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    snapshot["id"].as_str().unwrap().to_string()
}

fn step(from: [i8; 2], to: [i8; 2], color: &str) -> Value {
    json!({ "from": from, "to": to, "color": color })
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_create_game_returns_initial_snapshot() {
    let app = test_router().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/games",
        Some(json!({ "white": "alice", "black": "bob" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["turn"], "white");
    assert_eq!(body["status"], "ongoing");
    assert_eq!(body["mode"], "casual");
    assert_eq!(body["history"], json!([]));
    assert_eq!(body["players"]["white"], "alice");
    assert_eq!(body["timers"]["white"], 600.0);
}

#[tokio::test]
async fn test_move_updates_board_and_turn() {
    let app = test_router().await;
    let id = create(&app, json!({})).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/move/{id}"),
        Some(step([5, 2], [4, 3], "white")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["turn"], "black");
    assert_eq!(body["history"], json!(["C3->D4"]));

    let (status, board) = call(&app, "GET", &format!("/api/board/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["history"], body["history"]);
}

#[tokio::test]
async fn test_wrong_turn_is_rejected_with_detail() {
    let app = test_router().await;
    let id = create(&app, json!({})).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/move/{id}"),
        Some(step([2, 1], [3, 2], "black")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "wrong turn");
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let app = test_router().await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = call(&app, "GET", &format!("/api/board/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "game not found");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/move/{missing}"),
        Some(step([5, 2], [4, 3], "white")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_moves_and_snapshot_queries() {
    let app = test_router().await;
    let id = create(&app, json!({})).await;

    let (status, body) = call(
        &app,
        "GET",
        &format!("/api/moves/{id}?row=5&col=2&color=white"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let mut destinations: Vec<Value> = body["destinations"].as_array().unwrap().clone();
    destinations.sort_by_key(|v| v.to_string());
    assert_eq!(destinations, vec![json!([4, 1]), json!([4, 3])]);

    call(
        &app,
        "POST",
        &format!("/api/move/{id}"),
        Some(step([5, 2], [4, 3], "white")),
    )
    .await;

    let (status, ply) = call(&app, "GET", &format!("/api/snapshot/{id}/1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ply["notation"], "C3->D4");
    assert_eq!(ply["total"], 1);

    let (status, body) = call(&app, "GET", &format!("/api/snapshot/{id}/5"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "ply index out of range");
}

// ============================================================================
// Draws, resignation and replay
// ============================================================================

#[tokio::test]
async fn test_draw_by_agreement_over_http() {
    let app = test_router().await;
    let id = create(&app, json!({ "white": "alice", "black": "bob" })).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/draw_offer/{id}"),
        Some(json!({ "color": "white" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["draw_offer"], "white");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/draw_response/{id}"),
        Some(json!({ "color": "white", "accept": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "cannot answer own offer");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/draw_response/{id}"),
        Some(json!({ "color": "black", "accept": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "draw");
    assert_eq!(body["reason"], "agreement");
}

#[tokio::test]
async fn test_resign_then_replay_from_archive() {
    let app = test_router().await;
    let id = create(&app, json!({ "white": "alice", "black": "bob" })).await;

    call(
        &app,
        "POST",
        &format!("/api/move/{id}"),
        Some(step([5, 2], [4, 3], "white")),
    )
    .await;
    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/resign/{id}"),
        Some(json!({ "color": "black" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "white_win");
    assert_eq!(body["reason"], "resign");

    let (status, replay) = call(&app, "GET", &format!("/api/replay/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["history"], json!(["C3->D4"]));
    assert_eq!(replay["snapshots"].as_array().unwrap().len(), 2);

    // Out-of-range replay indices clamp to the final position
    let (status, ply) = call(&app, "GET", &format!("/api/replay/{id}/99"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ply["index"], 1);
    assert_eq!(ply["notation"], "C3->D4");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/move/{id}"),
        Some(step([2, 1], [3, 2], "black")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "game finished");
}

#[tokio::test]
async fn test_replay_of_live_game_is_not_found() {
    let app = test_router().await;
    let id = create(&app, json!({})).await;
    let (status, _) = call(&app, "GET", &format!("/api/replay/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Retries and concurrency
// ============================================================================

#[tokio::test]
async fn test_stale_resubmission_does_not_double_apply() {
    let app = test_router().await;
    let id = create(&app, json!({})).await;
    let mut submission = step([5, 2], [4, 3], "white");
    submission["expected_history_length"] = json!(0);

    let (status, _) = call(&app, "POST", &format!("/api/move/{id}"), Some(submission.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", &format!("/api/move/{id}"), Some(submission)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "stale submission");

    let (_, board) = call(&app, "GET", &format!("/api/board/{id}"), None).await;
    assert_eq!(board["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_submissions_apply_once() {
    let app = test_router().await;
    let id = create(&app, json!({})).await;
    let uri = format!("/api/move/{id}");
    let mut submission = step([5, 2], [4, 3], "white");
    submission["expected_history_length"] = json!(0);

    let (first, second) = tokio::join!(
        call(&app, "POST", &uri, Some(submission.clone())),
        call(&app, "POST", &uri, Some(submission.clone())),
    );
    let accepted = [first.0, second.0]
        .iter()
        .filter(|s| **s == StatusCode::OK)
        .count();
    assert_eq!(accepted, 1);

    let (_, board) = call(&app, "GET", &format!("/api/board/{id}"), None).await;
    assert_eq!(board["history"], json!(["C3->D4"]));
}

// ============================================================================
// Bot games
// ============================================================================

#[tokio::test]
async fn test_bot_replies_and_its_color_is_forbidden() {
    let app = test_router().await;
    let id = create(&app, json!({ "white": "alice", "mode": "bot" })).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/move/{id}"),
        Some(step([5, 2], [4, 3], "white")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["turn"], "white");
    assert_eq!(body["history"].as_array().unwrap().len(), 2);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/resign/{id}"),
        Some(json!({ "color": "black" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "invalid player");
}

#[tokio::test]
async fn test_current_game_lookup() {
    let app = test_router().await;
    let id = create(&app, json!({ "white": "alice", "black": "bob" })).await;

    let (status, body) = call(&app, "GET", "/api/users/bob/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["game_id"], id.as_str());
    assert_eq!(body["color"], "black");

    let (status, _) = call(&app, "GET", "/api/users/carol/current", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Clocks running out with nobody polling
// ============================================================================

fn zero_clock() -> Value {
    json!({ "white": "alice", "black": "bob", "clock_secs": 0 })
}

#[tokio::test]
async fn test_queries_record_an_overdue_timeout() {
    let app = test_router().await;
    let id = create(&app, zero_clock()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (status, body) = call(
        &app,
        "GET",
        &format!("/api/moves/{id}?row=5&col=2&color=white"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["destinations"], json!([]));

    let (_, board) = call(&app, "GET", &format!("/api/board/{id}"), None).await;
    assert_eq!(board["status"], "black_win");
    assert_eq!(board["reason"], "timeout");

    let (status, replay) = call(&app, "GET", &format!("/api/replay/{id}"), None).await;
    assert_eq!(status, StatusCode::OK, "Timeout was archived");
    assert_eq!(replay["reason"], "timeout");
}

#[tokio::test]
async fn test_captures_query_records_an_overdue_timeout() {
    let app = test_router().await;
    let id = create(&app, zero_clock()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (status, _) = call(
        &app,
        "GET",
        &format!("/api/captures/{id}?row=5&col=2&color=white"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, replay) = call(&app, "GET", &format!("/api/replay/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["status"], "black_win");
}

#[tokio::test]
async fn test_current_game_resolves_expired_clock() {
    let app = test_router().await;
    let id = create(&app, zero_clock()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (status, _) = call(&app, "GET", "/api/users/alice/current", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, replay) = call(&app, "GET", &format!("/api/replay/{id}"), None).await;
    assert_eq!(status, StatusCode::OK, "Asking about the user recorded the loss");
    assert_eq!(replay["reason"], "timeout");
}

#[tokio::test]
async fn test_sweeper_archives_and_evicts_abandoned_game() {
    let state = test_state().await;
    let app = api::router(state.clone());
    let id = create(&app, zero_clock()).await;

    let now = Instant::now() + Duration::from_millis(20);
    assert_eq!(state.sweep_once(now).await, 0);

    let (status, replay) = call(&app, "GET", &format!("/api/replay/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["reason"], "timeout");

    let later = now + state.directory.settings().finished_ttl;
    assert_eq!(state.sweep_once(later).await, 1);
    let (status, _) = call(&app, "GET", &format!("/api/board/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
