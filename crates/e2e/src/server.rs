//! In-process mock of the Altus IaaS API.
//!
//! Serves just enough of the `/iaas/api` surface for full provider
//! lifecycles: login, request tracking, and CRUD for block devices,
//! snapshots, networks, load balancers, and integrations. Every mutation
//! opens a tracked request that reports `IN_PROGRESS` for a scripted number
//! of polls before settling, which is how tests exercise the wait loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use altus_sdk::models::{
    AuthRequest, AuthResponse, Disk, DiskSpec, Integration, IntegrationSpec, LoadBalancer,
    LoadBalancerSpec, Network, NetworkSpec, ResultPage, Snapshot, SnapshotSpec,
};
use altus_sdk::RequestTracker;

use crate::error::{E2eError, E2eResult};

/// Refresh token the mock accepts at login.
pub const REFRESH_TOKEN: &str = "e2e-refresh-token";

const BEARER_TOKEN: &str = "e2e-bearer-token";
const HEALTH_ATTEMPTS: usize = 50;

enum Outcome {
    Finished(Vec<String>),
    Failed(String),
}

struct TrackedRequest {
    pending: u32,
    outcome: Outcome,
}

#[derive(Default)]
struct PlatformState {
    seq: AtomicU64,
    polls: AtomicU32,
    pending_polls: AtomicU32,
    fail_next: Mutex<Option<String>>,
    requests: Mutex<HashMap<String, TrackedRequest>>,
    disks: Mutex<HashMap<String, Disk>>,
    snapshots: Mutex<HashMap<String, (String, Snapshot)>>,
    networks: Mutex<HashMap<String, Network>>,
    load_balancers: Mutex<HashMap<String, LoadBalancer>>,
    integrations: Mutex<HashMap<String, Integration>>,
}

impl PlatformState {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn take_failure(&self) -> Option<String> {
        self.fail_next.lock().take()
    }

    fn open_request(&self, outcome: Outcome) -> RequestTracker {
        let id = format!("req-{}", Uuid::new_v4());
        self.requests.lock().insert(
            id.clone(),
            TrackedRequest {
                pending: self.pending_polls.load(Ordering::SeqCst),
                outcome,
            },
        );
        RequestTracker {
            id,
            status: "IN_PROGRESS".to_string(),
            ..Default::default()
        }
    }

    fn open_finished(&self, resources: Vec<String>) -> RequestTracker {
        self.open_request(Outcome::Finished(resources))
    }

    fn open_failed(&self, message: String) -> RequestTracker {
        self.open_request(Outcome::Failed(message))
    }
}

/// Handle to a running mock platform.
///
/// Dropping the handle shuts the server down.
pub struct MockPlatform {
    base_url: String,
    state: Arc<PlatformState>,
    server: JoinHandle<()>,
}

impl MockPlatform {
    /// Bind an ephemeral port, start serving, and wait until healthy.
    pub async fn start() -> E2eResult<Self> {
        let state = Arc::new(PlatformState::default());
        let app = router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("mock platform exited: {}", e);
            }
        });

        let platform = Self {
            base_url: format!("http://{addr}"),
            state,
            server,
        };
        platform.wait_until_healthy().await?;

        info!("mock platform listening at {}", platform.base_url);
        Ok(platform)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every request opened after this call reports `IN_PROGRESS` for `n`
    /// polls before settling.
    pub fn set_pending_polls(&self, n: u32) {
        self.state.pending_polls.store(n, Ordering::SeqCst);
    }

    /// The next mutating call opens a request that settles as `FAILED` with
    /// this message.
    pub fn fail_next_request(&self, message: &str) {
        *self.state.fail_next.lock() = Some(message.to_string());
    }

    /// Tracker polls served since startup.
    pub fn tracker_polls(&self) -> u32 {
        self.state.polls.load(Ordering::SeqCst)
    }

    pub fn disk_count(&self) -> usize {
        self.state.disks.lock().len()
    }

    async fn wait_until_healthy(&self) -> E2eResult<()> {
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.base_url);

        let mut last_error = None;
        for _ in 0..HEALTH_ATTEMPTS {
            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    warn!("health check returned {}", response.status());
                    last_error = None;
                }
                Err(e) => last_error = Some(e),
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        match last_error {
            Some(e) => Err(e.into()),
            None => Err(E2eError::HealthCheck(HEALTH_ATTEMPTS)),
        }
    }
}

impl Drop for MockPlatform {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Arc<PlatformState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/iaas/api/login", post(login))
        .route("/iaas/api/request-tracker/:id", get(get_request))
        .route(
            "/iaas/api/block-devices",
            post(create_disk).get(list_disks),
        )
        .route(
            "/iaas/api/block-devices/:disk_id",
            get(get_disk).post(disk_action).delete(delete_disk),
        )
        .route(
            "/iaas/api/block-devices/:disk_id/snapshots",
            post(create_snapshot),
        )
        .route(
            "/iaas/api/block-devices/:disk_id/snapshots/:snapshot_id",
            get(get_snapshot).delete(delete_snapshot),
        )
        .route("/iaas/api/networks", post(create_network).get(list_networks))
        .route(
            "/iaas/api/networks/:id",
            get(get_network).delete(delete_network),
        )
        .route(
            "/iaas/api/load-balancers",
            post(create_load_balancer).get(list_load_balancers),
        )
        .route(
            "/iaas/api/load-balancers/:id",
            get(get_load_balancer)
                .post(load_balancer_action)
                .delete(delete_load_balancer),
        )
        .route(
            "/iaas/api/integrations",
            post(create_integration).get(list_integrations),
        )
        .route(
            "/iaas/api/integrations/:id",
            get(get_integration)
                .patch(update_integration)
                .delete(delete_integration),
        )
        .with_state(state)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == format!("Bearer {BEARER_TOKEN}"))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "bearer token missing or invalid" })),
    )
        .into_response()
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("{what} not found") })),
    )
        .into_response()
}

fn accepted(tracker: RequestTracker) -> Response {
    (StatusCode::ACCEPTED, Json(tracker)).into_response()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Pull the exact-name match out of an OData-style `$filter` parameter.
fn filtered_name(params: &HashMap<String, String>) -> Option<String> {
    let filter = params.get("$filter")?;
    let name = filter.strip_prefix("name eq '")?.strip_suffix('\'')?;
    Some(name.to_string())
}

fn disk_link(id: &str) -> String {
    format!("/iaas/api/block-devices/{id}")
}

async fn health() -> &'static str {
    "ok"
}

async fn login(Json(auth): Json<AuthRequest>) -> Response {
    if auth.refresh_token != REFRESH_TOKEN {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "invalid refresh token" })),
        )
            .into_response();
    }
    Json(AuthResponse {
        token_type: Some("Bearer".to_string()),
        token: BEARER_TOKEN.to_string(),
    })
    .into_response()
}

async fn get_request(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.polls.fetch_add(1, Ordering::SeqCst);

    let mut requests = state.requests.lock();
    let Some(request) = requests.get_mut(&id) else {
        return not_found("request");
    };

    let record = if request.pending > 0 {
        request.pending -= 1;
        RequestTracker {
            id: id.clone(),
            status: "IN_PROGRESS".to_string(),
            progress: Some(50),
            ..Default::default()
        }
    } else {
        match &request.outcome {
            Outcome::Finished(resources) => RequestTracker {
                id: id.clone(),
                status: "FINISHED".to_string(),
                progress: Some(100),
                resources: resources.clone(),
                ..Default::default()
            },
            Outcome::Failed(message) => RequestTracker {
                id: id.clone(),
                status: "FAILED".to_string(),
                message: Some(message.clone()),
                ..Default::default()
            },
        }
    };
    Json(record).into_response()
}

// Block devices

async fn create_disk(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Json(spec): Json<DiskSpec>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if let Some(message) = state.take_failure() {
        return accepted(state.open_failed(message));
    }

    let id = state.next_id("bd");
    state.disks.lock().insert(
        id.clone(),
        Disk {
            id: id.clone(),
            name: spec.name,
            project_id: spec.project_id,
            capacity_in_gb: spec.capacity_in_gb,
            description: spec.description,
            persistent: spec.persistent,
            encrypted: spec.encrypted,
            status: Some("OK".to_string()),
            created_at: Some(now()),
        },
    );
    accepted(state.open_finished(vec![disk_link(&id)]))
}

async fn get_disk(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(disk_id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.disks.lock().get(&disk_id) {
        Some(disk) => Json(disk.clone()).into_response(),
        None => not_found("block device"),
    }
}

async fn list_disks(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let name = filtered_name(&params);
    let disks: Vec<Disk> = state
        .disks
        .lock()
        .values()
        .filter(|d| name.as_deref().map(|n| d.name == n).unwrap_or(true))
        .cloned()
        .collect();
    Json(ResultPage::of(disks)).into_response()
}

async fn disk_action(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(disk_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if params.get("action").map(String::as_str) != Some("resize") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "unsupported action" })),
        )
            .into_response();
    }
    let Some(capacity) = params.get("capacityInGB").and_then(|v| v.parse().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "capacityInGB is required" })),
        )
            .into_response();
    };

    if let Some(message) = state.take_failure() {
        return accepted(state.open_failed(message));
    }
    let mut disks = state.disks.lock();
    let Some(disk) = disks.get_mut(&disk_id) else {
        return not_found("block device");
    };
    disk.capacity_in_gb = capacity;
    drop(disks);
    accepted(state.open_finished(vec![disk_link(&disk_id)]))
}

async fn delete_disk(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(disk_id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.disks.lock().remove(&disk_id).is_none() {
        return not_found("block device");
    }
    if let Some(message) = state.take_failure() {
        return accepted(state.open_failed(message));
    }
    accepted(state.open_finished(vec![disk_link(&disk_id)]))
}

// Snapshots

async fn create_snapshot(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(disk_id): Path<String>,
    Json(spec): Json<SnapshotSpec>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if !state.disks.lock().contains_key(&disk_id) {
        return not_found("block device");
    }
    if let Some(message) = state.take_failure() {
        return accepted(state.open_failed(message));
    }

    let id = state.next_id("snap");
    state.snapshots.lock().insert(
        id.clone(),
        (
            disk_id.clone(),
            Snapshot {
                id: id.clone(),
                name: spec.name,
                description: spec.description,
                created_at: Some(now()),
            },
        ),
    );
    accepted(state.open_finished(vec![format!(
        "/iaas/api/block-devices/{disk_id}/snapshots/{id}"
    )]))
}

async fn get_snapshot(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path((disk_id, snapshot_id)): Path<(String, String)>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.snapshots.lock().get(&snapshot_id) {
        Some((parent, snapshot)) if *parent == disk_id => Json(snapshot.clone()).into_response(),
        _ => not_found("snapshot"),
    }
}

async fn delete_snapshot(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path((disk_id, snapshot_id)): Path<(String, String)>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut snapshots = state.snapshots.lock();
    match snapshots.get(&snapshot_id) {
        Some((parent, _)) if *parent == disk_id => {
            snapshots.remove(&snapshot_id);
        }
        _ => return not_found("snapshot"),
    }
    drop(snapshots);
    accepted(state.open_finished(vec![format!(
        "/iaas/api/block-devices/{disk_id}/snapshots/{snapshot_id}"
    )]))
}

// Networks

async fn create_network(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Json(spec): Json<NetworkSpec>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if let Some(message) = state.take_failure() {
        return accepted(state.open_failed(message));
    }

    let id = state.next_id("net");
    state.networks.lock().insert(
        id.clone(),
        Network {
            id: id.clone(),
            name: spec.name,
            project_id: spec.project_id,
            cidr: spec.cidr,
            description: spec.description,
            created_at: Some(now()),
        },
    );
    accepted(state.open_finished(vec![format!("/iaas/api/networks/{id}")]))
}

async fn get_network(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.networks.lock().get(&id) {
        Some(network) => Json(network.clone()).into_response(),
        None => not_found("network"),
    }
}

async fn list_networks(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let name = filtered_name(&params);
    let networks: Vec<Network> = state
        .networks
        .lock()
        .values()
        .filter(|n| name.as_deref().map(|f| n.name == f).unwrap_or(true))
        .cloned()
        .collect();
    Json(ResultPage::of(networks)).into_response()
}

async fn delete_network(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.networks.lock().remove(&id).is_none() {
        return not_found("network");
    }
    accepted(state.open_finished(vec![format!("/iaas/api/networks/{id}")]))
}

// Load balancers

async fn create_load_balancer(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Json(spec): Json<LoadBalancerSpec>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if let Some(message) = state.take_failure() {
        return accepted(state.open_failed(message));
    }

    let id = state.next_id("lb");
    state.load_balancers.lock().insert(
        id.clone(),
        LoadBalancer {
            id: id.clone(),
            name: spec.name,
            project_id: spec.project_id,
            description: spec.description,
            routes: spec.routes,
            target_links: spec.target_links,
            address: Some("203.0.113.10".to_string()),
            created_at: Some(now()),
        },
    );
    accepted(state.open_finished(vec![format!("/iaas/api/load-balancers/{id}")]))
}

async fn get_load_balancer(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.load_balancers.lock().get(&id) {
        Some(lb) => Json(lb.clone()).into_response(),
        None => not_found("load balancer"),
    }
}

async fn list_load_balancers(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let name = filtered_name(&params);
    let load_balancers: Vec<LoadBalancer> = state
        .load_balancers
        .lock()
        .values()
        .filter(|lb| name.as_deref().map(|f| lb.name == f).unwrap_or(true))
        .cloned()
        .collect();
    Json(ResultPage::of(load_balancers)).into_response()
}

async fn load_balancer_action(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(spec): Json<LoadBalancerSpec>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if params.get("action").map(String::as_str) != Some("scale") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "unsupported action" })),
        )
            .into_response();
    }

    if let Some(message) = state.take_failure() {
        return accepted(state.open_failed(message));
    }
    let mut load_balancers = state.load_balancers.lock();
    let Some(lb) = load_balancers.get_mut(&id) else {
        return not_found("load balancer");
    };
    lb.routes = spec.routes;
    lb.target_links = spec.target_links;
    drop(load_balancers);
    accepted(state.open_finished(vec![format!("/iaas/api/load-balancers/{id}")]))
}

async fn delete_load_balancer(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.load_balancers.lock().remove(&id).is_none() {
        return not_found("load balancer");
    }
    accepted(state.open_finished(vec![format!("/iaas/api/load-balancers/{id}")]))
}

// Integrations

async fn create_integration(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Json(spec): Json<IntegrationSpec>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if let Some(message) = state.take_failure() {
        return accepted(state.open_failed(message));
    }

    let id = state.next_id("int");
    state.integrations.lock().insert(
        id.clone(),
        Integration {
            id: id.clone(),
            name: spec.name,
            integration_type: spec.integration_type,
            description: spec.description,
            integration_properties: spec.integration_properties,
            status: Some("ACTIVE".to_string()),
            created_at: Some(now()),
        },
    );
    accepted(state.open_finished(vec![format!("/iaas/api/integrations/{id}")]))
}

async fn get_integration(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match state.integrations.lock().get(&id) {
        Some(integration) => Json(integration.clone()).into_response(),
        None => not_found("integration"),
    }
}

async fn list_integrations(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let name = filtered_name(&params);
    let integrations: Vec<Integration> = state
        .integrations
        .lock()
        .values()
        .filter(|i| name.as_deref().map(|f| i.name == f).unwrap_or(true))
        .cloned()
        .collect();
    Json(ResultPage::of(integrations)).into_response()
}

async fn update_integration(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(spec): Json<IntegrationSpec>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if let Some(message) = state.take_failure() {
        return accepted(state.open_failed(message));
    }
    let mut integrations = state.integrations.lock();
    let Some(integration) = integrations.get_mut(&id) else {
        return not_found("integration");
    };
    integration.name = spec.name;
    integration.integration_type = spec.integration_type;
    integration.description = spec.description;
    integration.integration_properties = spec.integration_properties;
    drop(integrations);
    accepted(state.open_finished(vec![format!("/iaas/api/integrations/{id}")]))
}

async fn delete_integration(
    State(state): State<Arc<PlatformState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if state.integrations.lock().remove(&id).is_none() {
        return not_found("integration");
    }
    accepted(state.open_finished(vec![format!("/iaas/api/integrations/{id}")]))
}
