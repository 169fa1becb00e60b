// GET/POST handlers: version, projects, snapshots, auth

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::registry::SelectError;

/// Package name and version (from Cargo.toml at build time).
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `{error}` body with a status code.
pub(super) struct ErrorResponse(pub StatusCode, pub String);

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

/// GET /version: returns service name and version.
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/projects
pub(super) async fn list_projects(State(state): State<AppState>) -> impl IntoResponse {
    let projects = state.registry.projects().await;
    let current = state.registry.current().await.map(|p| p.id);
    Json(serde_json::json!({
        "projects": projects,
        "currentProjectId": current,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SelectRequest {
    project_id: String,
}

/// POST /api/projects/select
pub(super) async fn select_project(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> Response {
    match state.registry.select(&req.project_id).await {
        Ok(project) => Json(project).into_response(),
        Err(e @ SelectError::NotFound(_)) => {
            ErrorResponse(StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        Err(e @ SelectError::Disabled(_)) => {
            ErrorResponse(StatusCode::CONFLICT, e.to_string()).into_response()
        }
    }
}

/// POST /api/projects/reload: re-read project configuration and restart polling.
pub(super) async fn reload_projects(State(state): State<AppState>) -> Response {
    state.registry.reload().await;
    state.clients.clear().await;
    let projects = state.registry.projects().await;
    let polling = match state.pollers.start(&projects).await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, operation = "reload_projects", "could not restart pollers");
            return ErrorResponse(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                .into_response();
        }
    };
    let current = state.registry.current().await.map(|p| p.id);
    Json(serde_json::json!({
        "projects": projects,
        "currentProjectId": current,
        "polling": polling,
    }))
    .into_response()
}

/// GET /api/projects/{id}/snapshot: latest polled snapshot.
pub(super) async fn project_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.snapshots.read().await.get(&id) {
        Some(snapshot) => Json(snapshot.clone()).into_response(),
        None => ErrorResponse(StatusCode::NOT_FOUND, format!("no snapshot for {}", id))
            .into_response(),
    }
}

/// GET /api/snapshots: latest snapshot of every polled project, ordered by id.
pub(super) async fn all_snapshots(State(state): State<AppState>) -> impl IntoResponse {
    let mut snapshots: Vec<_> = state.snapshots.read().await.values().cloned().collect();
    snapshots.sort_by(|a, b| a.project_id.cmp(&b.project_id));
    Json(snapshots)
}

/// GET /api/auth/status
pub(super) async fn auth_status(State(state): State<AppState>) -> impl IntoResponse {
    let credentials = state.clients.credentials();
    let authenticated = credentials.is_authenticated().await;
    let user = if authenticated {
        credentials.user().await
    } else {
        None
    };
    Json(serde_json::json!({
        "authenticated": authenticated,
        "user": user,
    }))
}

#[derive(Deserialize)]
pub(super) struct LoginRequest {
    email: String,
    password: String,
}

/// POST /api/auth/login: authenticates against the current project's backend.
pub(super) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Response {
    let current = state.registry.current().await;
    let client = match state.clients.get(current.as_ref()).await {
        Ok(c) => c,
        Err(e) => {
            return ErrorResponse(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                .into_response();
        }
    };
    match client.login(&req.email, &req.password).await {
        Ok(session) => Json(session.user).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "login", backend = client.base_url(), "login failed");
            ErrorResponse(StatusCode::UNAUTHORIZED, e.to_string()).into_response()
        }
    }
}

/// POST /api/auth/logout
pub(super) async fn logout(State(state): State<AppState>) -> Response {
    match state.clients.credentials().clear().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            ErrorResponse(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
