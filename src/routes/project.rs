// Per-project passthrough handlers: Actuator views and monitoring extension data.
// Extension endpoints return placeholders when the backend lacks them; Actuator
// failures surface as 502.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;
use super::http::ErrorResponse;
use crate::api_client::ApiClient;
use crate::error::ApiError;
use crate::models::{LogLevel, LogQuery};
use crate::prometheus;

async fn client_for(state: &AppState, id: &str) -> Result<Arc<ApiClient>, ErrorResponse> {
    let project = state
        .registry
        .get(id)
        .await
        .ok_or_else(|| ErrorResponse(StatusCode::NOT_FOUND, format!("unknown project {}", id)))?;
    state
        .clients
        .get(Some(&project))
        .await
        .map_err(|e| ErrorResponse(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

fn bad_gateway(e: ApiError) -> ErrorResponse {
    ErrorResponse(StatusCode::BAD_GATEWAY, e.to_string())
}

/// GET /api/projects/{id}/actuator/info
pub(super) async fn actuator_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ErrorResponse> {
    let client = client_for(&state, &id).await?;
    let info = client.info().await.map_err(bad_gateway)?;
    Ok(Json(info).into_response())
}

/// GET /api/projects/{id}/actuator/metrics: metric names.
pub(super) async fn metric_names(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ErrorResponse> {
    let client = client_for(&state, &id).await?;
    let list = client.metrics_list().await.map_err(bad_gateway)?;
    Ok(Json(list).into_response())
}

/// GET /api/projects/{id}/actuator/metrics/{name}
pub(super) async fn metric_detail(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Response, ErrorResponse> {
    let client = client_for(&state, &id).await?;
    let descriptor = client.metric(&name, &[]).await.map_err(bad_gateway)?;
    Ok(Json(descriptor).into_response())
}

/// GET /api/projects/{id}/actuator/prometheus: samples grouped by metric name.
pub(super) async fn prometheus_samples(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ErrorResponse> {
    let client = client_for(&state, &id).await?;
    let text = client.prometheus().await.map_err(bad_gateway)?;
    Ok(Json(prometheus::parse(&text)).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct LogParams {
    level: Option<LogLevel>,
    limit: Option<u32>,
    search: Option<String>,
}

/// GET /api/projects/{id}/logs?level=&limit=&search=
pub(super) async fn logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LogParams>,
) -> Result<Response, ErrorResponse> {
    let client = client_for(&state, &id).await?;
    let query = LogQuery {
        level: params.level,
        limit: params.limit,
        search: params.search.filter(|s| !s.is_empty()),
    };
    let (entries, stats) = tokio::join!(client.logs(&query), client.log_stats());
    Ok(Json(serde_json::json!({ "entries": entries, "stats": stats })).into_response())
}

/// GET /api/projects/{id}/alerts: active alerts and history.
pub(super) async fn alerts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ErrorResponse> {
    let client = client_for(&state, &id).await?;
    let (active, history) = tokio::join!(client.alerts(), client.alert_history());
    Ok(Json(serde_json::json!({ "active": active, "history": history })).into_response())
}

/// GET /api/projects/{id}/errors
pub(super) async fn errors(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ErrorResponse> {
    let client = client_for(&state, &id).await?;
    let (distribution, trends) =
        tokio::join!(client.error_distribution(), client.error_trends());
    Ok(Json(serde_json::json!({ "distribution": distribution, "trends": trends })).into_response())
}

/// GET /api/projects/{id}/business
pub(super) async fn business(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ErrorResponse> {
    let client = client_for(&state, &id).await?;
    let (metrics, funnel, pi_status) = tokio::join!(
        client.business_metrics(),
        client.conversion_funnel(),
        client.pi_status_distribution(),
    );
    Ok(Json(serde_json::json!({
        "metrics": metrics,
        "funnel": funnel,
        "piStatus": pi_status,
    }))
    .into_response())
}

/// GET /api/projects/{id}/runtime: JVM, database, and GC detail beyond the snapshot.
pub(super) async fn runtime(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ErrorResponse> {
    let client = client_for(&state, &id).await?;
    let (jvm, database, committed, gc_pause) = tokio::join!(
        client.jvm_metrics(),
        client.database_metrics(),
        client.jvm_memory_committed(),
        client.jvm_gc_pause(),
    );
    Ok(Json(serde_json::json!({
        "jvm": jvm,
        "database": database,
        "memoryCommitted": committed.ok(),
        "gcPause": gc_pause.ok(),
    }))
    .into_response())
}
