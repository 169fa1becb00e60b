// Per-project polling worker. Each tick spawns one detached cycle; cycles are not
// coalesced, so a slow backend can have several in flight. Shutdown stops the timer only.

use crate::api_client::{ApiClient, ClientPool};
use crate::config::PollingConfig;
use crate::models::{
    EndpointMetric, EndpointsSource, Health, HttpRequestSummary, JvmMemory, MetricDescriptor,
    ProcessStats, Project, ProjectOverview, ProjectSnapshot, ThreadStats, TrafficOverview, round2,
    statistic,
};
use crate::reconstruct;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};
use tracing::Instrument;

/// Latest snapshot per project id. Last writer wins.
pub type SnapshotMap = Arc<RwLock<HashMap<String, ProjectSnapshot>>>;

/// Client, shared state, and shutdown for one project's worker.
pub struct WorkerDeps {
    pub client: Arc<ApiClient>,
    pub snapshots: SnapshotMap,
    pub tx: broadcast::Sender<ProjectSnapshot>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// What a cycle fetches and how often.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub project_id: String,
    pub interval_secs: u64,
    pub max_concurrent_fetches: usize,
    pub api_metrics_time_range: Option<String>,
    /// Reconstruct from Actuator when the fast path is empty; otherwise estimate.
    pub reconstruct: bool,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> JoinHandle<()> {
    let WorkerDeps {
        client,
        snapshots,
        tx,
        mut shutdown_rx,
    } = deps;
    let config = Arc::new(config);

    let worker_span = tracing::span!(
        tracing::Level::DEBUG,
        "worker",
        project = %config.project_id,
        interval_secs = config.interval_secs
    );

    tokio::spawn(
        async move {
            let mut tick = interval(Duration::from_secs(config.interval_secs));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let client = client.clone();
                        let snapshots = snapshots.clone();
                        let tx = tx.clone();
                        let config = config.clone();
                        tokio::spawn(async move {
                            let snapshot = run_cycle(&client, &config).await;
                            publish(&snapshots, &tx, snapshot).await;
                        });
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Worker shutting down");
                        break;
                    }
                }
            }
        }
        .instrument(worker_span),
    )
}

/// The running set of workers, one per enabled project. `start` replaces the whole
/// set, so a registry reload takes effect without a restart.
pub struct Pollers {
    clients: Arc<ClientPool>,
    snapshots: SnapshotMap,
    tx: broadcast::Sender<ProjectSnapshot>,
    polling: PollingConfig,
    running: Mutex<Vec<(oneshot::Sender<()>, JoinHandle<()>)>>,
}

impl Pollers {
    pub fn new(
        clients: Arc<ClientPool>,
        snapshots: SnapshotMap,
        tx: broadcast::Sender<ProjectSnapshot>,
        polling: PollingConfig,
    ) -> Self {
        Self {
            clients,
            snapshots,
            tx,
            polling,
            running: Mutex::new(Vec::new()),
        }
    }

    /// Stop every worker, then start one per enabled project in `projects`. Snapshots
    /// of projects no longer polled are dropped. Returns the number started.
    pub async fn start(&self, projects: &[Project]) -> anyhow::Result<usize> {
        let mut running = self.running.lock().await;
        stop_all(std::mem::take(&mut *running)).await;

        let enabled: Vec<&Project> = projects.iter().filter(|p| p.enabled).collect();
        self.snapshots
            .write()
            .await
            .retain(|id, _| enabled.iter().any(|p| &p.id == id));

        for project in enabled {
            let client = self.clients.get(Some(project)).await?;
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            tracing::info!(project = %project.id, backend = client.base_url(), "starting poller");
            let handle = spawn(
                WorkerDeps {
                    client,
                    snapshots: self.snapshots.clone(),
                    tx: self.tx.clone(),
                    shutdown_rx,
                },
                WorkerConfig {
                    project_id: project.id.clone(),
                    interval_secs: self.polling.interval_secs,
                    max_concurrent_fetches: self.polling.max_concurrent_fetches,
                    api_metrics_time_range: self.polling.api_metrics_time_range.clone(),
                    reconstruct: self.polling.reconstruct,
                },
            );
            running.push((shutdown_tx, handle));
        }
        Ok(running.len())
    }

    /// Stop every worker and wait for their timers to exit.
    pub async fn stop(&self) {
        let workers = std::mem::take(&mut *self.running.lock().await);
        stop_all(workers).await;
    }

    pub async fn running_count(&self) -> usize {
        self.running.lock().await.len()
    }
}

async fn stop_all(workers: Vec<(oneshot::Sender<()>, JoinHandle<()>)>) {
    for (shutdown_tx, handle) in workers {
        let _ = shutdown_tx.send(());
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, operation = "stop_worker", "worker task failed");
        }
    }
}

/// Store `snapshot` as the project's latest and broadcast it.
pub async fn publish(
    snapshots: &SnapshotMap,
    tx: &broadcast::Sender<ProjectSnapshot>,
    snapshot: ProjectSnapshot,
) {
    snapshots
        .write()
        .await
        .insert(snapshot.project_id.clone(), snapshot.clone());
    if tx.send(snapshot).is_err() {
        tracing::trace!(
            operation = "broadcast_snapshot",
            "No active WebSocket clients; broadcast channel has no receivers"
        );
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

fn value_of(d: &MetricDescriptor) -> f64 {
    d.measurement_or_zero(statistic::VALUE)
}

/// One polling pass. Every source is optional: failures degrade to DOWN health,
/// empty lists or missing sections, never to an error.
pub async fn run_cycle(client: &ApiClient, config: &WorkerConfig) -> ProjectSnapshot {
    let timestamp = now_millis();

    let (health, fast_path, base) = tokio::join!(
        client.health(),
        client.api_metrics(config.api_metrics_time_range.as_deref()),
        client.http_server_requests(&[]),
    );
    let health = health.unwrap_or_else(|e| {
        tracing::warn!(
            project = %config.project_id,
            error = %e,
            operation = "health",
            "health check failed; reporting DOWN"
        );
        Health::down()
    });
    let base = base
        .inspect_err(|e| {
            tracing::debug!(
                project = %config.project_id,
                error = %e,
                operation = "http_server_requests",
                "base request metric unavailable"
            )
        })
        .ok();

    let (endpoints, endpoints_source) =
        select_endpoints(client, config, fast_path, base.as_ref()).await;
    let traffic = match (endpoints_source, base.as_ref()) {
        (EndpointsSource::Estimated, Some(b)) => TrafficOverview::from_base(b).with_errors(
            reconstruct::error_total(client, b, config.max_concurrent_fetches).await,
        ),
        _ => TrafficOverview::from_endpoints(&endpoints),
    };
    let overview = ProjectOverview {
        score: if health.is_up() { 100 } else { 0 },
        traffic: TrafficOverview {
            error_rate: round2(traffic.error_rate),
            avg_response_time: round2(traffic.avg_response_time),
            ..traffic
        },
    };

    let (mem_used, mem_max, threads_live, threads_peak, uptime, cpu) = tokio::join!(
        client.jvm_memory_used(),
        client.jvm_memory_max(),
        client.jvm_threads_live(),
        client.jvm_threads_peak(),
        client.process_uptime(),
        client.process_cpu_usage(),
    );
    let jvm_memory = match (mem_used, mem_max) {
        (Ok(used), Ok(max)) => Some(JvmMemory::from_descriptors(&used, &max)),
        _ => None,
    };
    let threads = match (threads_live, threads_peak) {
        (Ok(live), Ok(peak)) => Some(ThreadStats {
            live: value_of(&live),
            peak: value_of(&peak),
        }),
        _ => None,
    };
    let process = match (uptime, cpu) {
        (Ok(uptime), Ok(cpu)) => Some(ProcessStats {
            uptime_secs: value_of(&uptime),
            cpu_usage: value_of(&cpu),
        }),
        _ => None,
    };

    let (system, business, external_services) = tokio::join!(
        client.system_metrics(),
        client.business_metrics(),
        client.external_service_metrics(),
    );

    tracing::debug!(
        project = %config.project_id,
        endpoints = endpoints.len(),
        source = ?endpoints_source,
        health = ?health.status,
        "cycle complete"
    );

    ProjectSnapshot {
        project_id: config.project_id.clone(),
        timestamp,
        health,
        overview,
        endpoints,
        endpoints_source,
        http_summary: base.as_ref().map(HttpRequestSummary::from_descriptor),
        jvm_memory,
        threads,
        process,
        system,
        business,
        external_services,
    }
}

/// Fast path first, then reconstruction (or the estimate when disabled).
async fn select_endpoints(
    client: &ApiClient,
    config: &WorkerConfig,
    fast_path: Vec<EndpointMetric>,
    base: Option<&MetricDescriptor>,
) -> (Vec<EndpointMetric>, EndpointsSource) {
    if !fast_path.is_empty() {
        return (fast_path, EndpointsSource::Backend);
    }
    let Some(base) = base else {
        return (Vec::new(), EndpointsSource::None);
    };
    if config.reconstruct {
        let endpoints = reconstruct::reconstruct(client, base, config.max_concurrent_fetches).await;
        (endpoints, EndpointsSource::Reconstructed)
    } else {
        (reconstruct::estimate(base), EndpointsSource::Estimated)
    }
}
