//! ApiClient tests against a scripted in-process HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use altus_sdk::models::DiskSpec;
use altus_sdk::{ApiClient, Error};

/// Requests the scripted platform has seen, for assertions.
#[derive(Default)]
struct Captured {
    auth_headers: Mutex<Vec<String>>,
    disk_posts: Mutex<Vec<Value>>,
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["refreshToken"] == "good-token" {
        Json(json!({ "tokenType": "Bearer", "token": "bearer-abc" })).into_response()
    } else {
        (StatusCode::FORBIDDEN, "invalid refresh token").into_response()
    }
}

async fn tracker(
    State(captured): State<Arc<Captured>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        captured.auth_headers.lock().push(auth.to_string());
    }
    match id.as_str() {
        "req-finished" => Json(json!({
            "id": "req-finished",
            "status": "FINISHED",
            "progress": 100,
            "resources": ["/iaas/api/block-devices/bd-9"]
        }))
        .into_response(),
        "req-broken" => (StatusCode::INTERNAL_SERVER_ERROR, "platform exploded").into_response(),
        _ => Json(json!({ "id": id, "status": "IN_PROGRESS" })).into_response(),
    }
}

async fn create_disk(State(captured): State<Arc<Captured>>, Json(body): Json<Value>) -> Response {
    captured.disk_posts.lock().push(body);
    (
        StatusCode::ACCEPTED,
        Json(json!({ "id": "req-create", "status": "IN_PROGRESS" })),
    )
        .into_response()
}

async fn get_disk(Path(id): Path<String>) -> Response {
    if id == "bd-9" {
        Json(json!({
            "id": "bd-9",
            "name": "data",
            "projectId": "proj-1",
            "capacityInGB": 20,
            "status": "OK"
        }))
        .into_response()
    } else {
        (StatusCode::NOT_FOUND, "no such disk").into_response()
    }
}

async fn start_platform() -> (SocketAddr, Arc<Captured>) {
    let captured = Arc::new(Captured::default());
    let app = Router::new()
        .route("/iaas/api/login", post(login))
        .route("/iaas/api/request-tracker/:id", get(tracker))
        .route("/iaas/api/block-devices", post(create_disk))
        .route("/iaas/api/block-devices/:id", get(get_disk))
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, captured)
}

#[tokio::test]
async fn login_sets_bearer_token_for_later_requests() {
    let (addr, captured) = start_platform().await;

    let client = ApiClient::connect(&format!("http://{addr}"), "good-token")
        .await
        .unwrap();
    let tracker = client.get_request_tracker("req-finished").await.unwrap();

    assert_eq!(tracker.status, "FINISHED");
    let headers = captured.auth_headers.lock();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0], "Bearer bearer-abc");
}

#[tokio::test]
async fn rejected_refresh_token_is_an_auth_error() {
    let (addr, _) = start_platform().await;

    let err = ApiClient::connect(&format!("http://{addr}"), "bad-token")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    assert!(err.to_string().contains("invalid refresh token"));
}

#[tokio::test]
async fn create_disk_posts_platform_field_casing() {
    let (addr, captured) = start_platform().await;
    let client = ApiClient::with_token(&format!("http://{addr}"), "tok");

    let spec = DiskSpec {
        name: "data".to_string(),
        project_id: "proj-1".to_string(),
        capacity_in_gb: 20,
        ..Default::default()
    };
    let tracker = client.create_disk(&spec).await.unwrap();

    assert_eq!(tracker.id, "req-create");
    let posts = captured.disk_posts.lock();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["capacityInGB"], 20);
    assert_eq!(posts[0]["projectId"], "proj-1");
}

#[tokio::test]
async fn finished_tracker_decodes_resource_links() {
    let (addr, _) = start_platform().await;
    let client = ApiClient::with_token(&format!("http://{addr}"), "tok");

    let tracker = client.get_request_tracker("req-finished").await.unwrap();

    assert_eq!(tracker.progress, Some(100));
    assert_eq!(tracker.resources, vec!["/iaas/api/block-devices/bd-9"]);
}

#[tokio::test]
async fn missing_disk_maps_to_not_found() {
    let (addr, _) = start_platform().await;
    let client = ApiClient::with_token(&format!("http://{addr}"), "tok");

    let err = client.get_disk("bd-missing").await.unwrap_err();

    match err {
        Error::NotFound { kind, id } => {
            assert_eq!(kind, "block device");
            assert_eq!(id, "bd-missing");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_surfaces_body_as_api_error() {
    let (addr, _) = start_platform().await;
    let client = ApiClient::with_token(&format!("http://{addr}"), "tok");

    let err = client.get_request_tracker("req-broken").await.unwrap_err();

    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "platform exploded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}
