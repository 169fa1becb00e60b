use actuator_monitor::*;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{RwLock, broadcast};
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let kv = Arc::new(credential_store::SqliteKvStore::connect(&app_config.storage.path).await?);
    kv.init().await?;
    let kv: Arc<dyn credential_store::KvStore> = kv;

    let credentials = Arc::new(credential_store::CredentialStore::new(kv.clone()));
    let registry = Arc::new(
        registry::ProjectRegistry::load(&app_config.projects.env_prefix, kv.clone()).await,
    );
    let clients = Arc::new(api_client::ClientPool::new(
        &app_config.auth.default_api_url,
        Duration::from_secs(app_config.auth.request_timeout_secs),
        credentials.clone(),
    ));

    let (tx, _) =
        broadcast::channel::<models::ProjectSnapshot>(app_config.polling.broadcast_capacity);
    let snapshots: worker::SnapshotMap = Arc::new(RwLock::new(HashMap::new()));

    let pollers = Arc::new(worker::Pollers::new(
        clients.clone(),
        snapshots.clone(),
        tx.clone(),
        app_config.polling.clone(),
    ));
    pollers.start(&registry.projects().await).await?;

    let app = routes::app(
        registry,
        clients,
        pollers.clone(),
        snapshots,
        tx,
        Arc::new(AtomicUsize::new(0)),
    );
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            pollers.stop().await;
        }
    }

    Ok(())
}
