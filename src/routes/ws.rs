// WebSocket snapshot stream

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::ProjectSnapshot;
use crate::worker::SnapshotMap;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements the /ws/snapshots connection count on drop (connect = +1, drop = -1).
struct WsConnectionGuard(Arc<AtomicUsize>);

impl Drop for WsConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
    }
}

/// False when the client is gone or too slow to take the message.
async fn send_or_close(socket: &mut WebSocket, message: Message) -> bool {
    matches!(timeout(WS_SEND_TIMEOUT, socket.send(message)).await, Ok(Ok(())))
}

pub(super) async fn ws_snapshots(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let tx = state.snapshot_tx.clone();
    let snapshots = state.snapshots.clone();
    let conn_count = state.ws_snapshot_connections.clone();
    ws.on_upgrade(move |socket| async move {
        let mut rx = tx.subscribe();
        if let Err(e) = stream_snapshots(socket, &mut rx, snapshots, conn_count).await {
            tracing::info!("Snapshot stream error: {}", e);
        }
    })
}

/// Sends `{"type":"info","snapshots":[...]}` with the latest state, then every new
/// snapshot as it is published.
async fn stream_snapshots(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<ProjectSnapshot>,
    snapshots: SnapshotMap,
    conn_count: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    let clients = conn_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
    let _guard = WsConnectionGuard(conn_count);
    tracing::info!(ws_snapshot_clients = clients, "Client connected to snapshot stream");

    let mut latest: Vec<ProjectSnapshot> = snapshots.read().await.values().cloned().collect();
    latest.sort_by(|a, b| a.project_id.cmp(&b.project_id));
    let welcome = serde_json::json!({ "type": "info", "snapshots": latest });
    if !send_or_close(&mut socket, Message::Text(serde_json::to_string(&welcome)?.into())).await {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(snapshot) => {
                        let json = serde_json::to_string(&snapshot)?;
                        if !send_or_close(&mut socket, Message::Text(json.into())).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/snapshots client lagged, skipped {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                if !send_or_close(&mut socket, Message::Ping(Bytes::new())).await {
                    break;
                }
            }
        }
    }
    Ok(())
}
