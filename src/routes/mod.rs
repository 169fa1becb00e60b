// HTTP + WebSocket routes

mod http;
mod project;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::api_client::ClientPool;
use crate::models::ProjectSnapshot;
use crate::registry::ProjectRegistry;
use crate::worker::{Pollers, SnapshotMap};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) registry: Arc<ProjectRegistry>,
    pub(crate) clients: Arc<ClientPool>,
    pub(crate) pollers: Arc<Pollers>,
    pub(crate) snapshots: SnapshotMap,
    pub(crate) snapshot_tx: broadcast::Sender<ProjectSnapshot>,
    pub(crate) ws_snapshot_connections: Arc<AtomicUsize>,
}

pub fn app(
    registry: Arc<ProjectRegistry>,
    clients: Arc<ClientPool>,
    pollers: Arc<Pollers>,
    snapshots: SnapshotMap,
    snapshot_tx: broadcast::Sender<ProjectSnapshot>,
    ws_snapshot_connections: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        registry,
        clients,
        pollers,
        snapshots,
        snapshot_tx,
        ws_snapshot_connections,
    };
    Router::new()
        .route("/", get(|| async { "actuator-monitor is running" }))
        .route("/version", get(http::version_handler))
        .route("/api/projects", get(http::list_projects))
        .route("/api/projects/select", post(http::select_project))
        .route("/api/projects/reload", post(http::reload_projects))
        .route("/api/projects/{id}/snapshot", get(http::project_snapshot))
        .route("/api/snapshots", get(http::all_snapshots))
        .route("/api/auth/status", get(http::auth_status))
        .route("/api/auth/login", post(http::login))
        .route("/api/auth/logout", post(http::logout))
        .route("/api/projects/{id}/actuator/info", get(project::actuator_info))
        .route("/api/projects/{id}/actuator/metrics", get(project::metric_names))
        .route(
            "/api/projects/{id}/actuator/metrics/{name}",
            get(project::metric_detail),
        )
        .route(
            "/api/projects/{id}/actuator/prometheus",
            get(project::prometheus_samples),
        )
        .route("/api/projects/{id}/logs", get(project::logs))
        .route("/api/projects/{id}/alerts", get(project::alerts))
        .route("/api/projects/{id}/errors", get(project::errors))
        .route("/api/projects/{id}/business", get(project::business))
        .route("/api/projects/{id}/runtime", get(project::runtime))
        .route("/ws/snapshots", get(ws::ws_snapshots))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
