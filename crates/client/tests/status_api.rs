//! Integration tests for the status REST client against an in-process
//! HTTP server.

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::Path;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use reel_client::poller::PollMode;
use reel_client::{StatusApi, StatusApiError, StatusPoller, StatusSource, StatusTarget};
use reel_core::polling::IdleReason;
use reel_core::{StepCatalog, StepKey, StepState};

const TOKEN: &str = "secret-token";

// ---------------------------------------------------------------------------
// Test server
// ---------------------------------------------------------------------------

async fn status_handler(
    Path((script_id, version_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some("Bearer secret-token");
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match script_id.as_str() {
        "broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "analysis store unavailable",
        )
            .into_response(),
        "done" => Json(json!({
            "versionId": version_id,
            "statuses": {
                "scriptSummary": { "status": "Completed" },
                "sceneBreakdown": { "status": "Completed", "creditInfo": { "creditsUsed": 3 } }
            }
        }))
        .into_response(),
        _ => Json(json!({
            "versionId": version_id,
            "statuses": {
                "scriptSummary": { "status": "Completed" },
                "processedImages": { "status": "Completed" },
                "processScenesAndShots": {
                    "status": "InProgress",
                    "data": [
                        { "sceneId": 1, "shots": [
                            { "shotNumber": 1, "status": "Completed", "error": null },
                            { "shotNumber": 2, "status": "Pending", "error": null }
                        ]}
                    ]
                }
            }
        }))
        .into_response(),
    }
}

/// Serve the status route on an ephemeral port and return its base URL.
async fn spawn_server() -> String {
    let app = Router::new().route(
        "/scripts/{script_id}/versions/{version_id}/analysis/status",
        get(status_handler),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// StatusApi
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetches_and_parses_snapshot() {
    let base = spawn_server().await;
    let api = StatusApi::new(base).with_token(TOKEN);

    let snapshot = api
        .get_status(&StatusTarget::new("script-1", "v3"))
        .await
        .expect("status fetch should succeed");

    assert_eq!(snapshot.len(), 3);
    let processing = snapshot.get(&StepKey::ProcessScenesAndShots).unwrap();
    assert_eq!(processing.state, StepState::InProgress);
    assert!(processing.detail().scenes().is_some());
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let base = spawn_server().await;
    let api = StatusApi::new(base);

    let result = api.get_status(&StatusTarget::new("script-1", "v3")).await;
    assert_matches!(result, Err(StatusApiError::Unauthorized { status: 401 }));
}

#[tokio::test]
async fn server_error_carries_body() {
    let base = spawn_server().await;
    let api = StatusApi::new(base).with_token(TOKEN);

    let result = api.get_status(&StatusTarget::new("broken", "v1")).await;
    assert_matches!(
        result,
        Err(StatusApiError::Api { status: 500, ref body }) if body.contains("unavailable")
    );
}

#[tokio::test]
async fn connection_failure_is_request_error() {
    // Nothing listens on port 9 on a test host.
    let api = StatusApi::new("http://127.0.0.1:9").with_token(TOKEN);
    let result = api.get_status(&StatusTarget::new("script-1", "v1")).await;
    assert_matches!(result, Err(StatusApiError::Request(_)));
}

// ---------------------------------------------------------------------------
// Poller over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poller_goes_idle_on_completed_pipeline() {
    let base = spawn_server().await;
    let api = Arc::new(StatusApi::new(base).with_token(TOKEN));

    let handle = StatusPoller::new(api, StatusTarget::new("done", "v1"), StepCatalog::default()).spawn();
    let mut rx = handle.subscribe();
    rx.wait_for(|s| s.fetch_count == 1).await.unwrap();

    let state = handle.state();
    assert_eq!(state.mode, PollMode::Idle(IdleReason::AllCompleted));
    let view = state.view.expect("view is built after a fetch");
    assert_eq!(view.overall_progress, 100.0);
    assert_eq!(view.total_credits, 3.0);

    handle.shutdown().await;
}

#[tokio::test]
async fn poller_view_drops_legacy_alias() {
    let base = spawn_server().await;
    let api = Arc::new(StatusApi::new(base).with_token(TOKEN));

    let handle =
        StatusPoller::new(api, StatusTarget::new("script-1", "v1"), StepCatalog::default()).spawn();
    let mut rx = handle.subscribe();
    rx.wait_for(|s| s.fetch_count == 1).await.unwrap();

    let state = handle.state();
    assert_eq!(state.mode, PollMode::Polling);
    let view = state.view.unwrap();
    assert!(view.row(&StepKey::ProcessedImages).is_none());
    assert_eq!(
        view.row(&StepKey::ProcessScenesAndShots).unwrap().progress,
        Some(50.0)
    );

    handle.shutdown().await;
}
