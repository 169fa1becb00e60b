// Shared test helpers
#![allow(dead_code)]

use actuator_monitor::api_client::ApiClient;
use actuator_monitor::credential_store::{CredentialStore, MemoryKvStore};
use actuator_monitor::models::{Measurement, MetricDescriptor, MetricTag, Project, User};
use std::sync::Arc;
use std::time::Duration;

pub const ACCESS: &str = "old.access.token";
pub const REFRESH: &str = "rrr.sss.ttt";

/// Serve `router` on an ephemeral local port; returns its base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn memory_credentials() -> Arc<CredentialStore> {
    Arc::new(CredentialStore::new(Arc::new(MemoryKvStore::new())))
}

pub fn client(base_url: &str, credentials: Arc<CredentialStore>) -> ApiClient {
    ApiClient::new(None, base_url, Duration::from_secs(5), credentials).unwrap()
}

pub fn user() -> User {
    User {
        id: "42".into(),
        email: "ops@example.com".into(),
        role: "ADMIN".into(),
        is_two_factor_enabled: false,
    }
}

pub fn project(id: &str, api_url: &str, enabled: bool) -> Project {
    Project {
        id: id.into(),
        name: format!("Project {}", id),
        api_url: api_url.into(),
        description: None,
        color: None,
        enabled,
    }
}

/// Descriptor with the given statistics and tag values.
pub fn descriptor(name: &str, stats: &[(&str, f64)], tags: &[(&str, &[&str])]) -> MetricDescriptor {
    MetricDescriptor {
        name: name.into(),
        measurements: stats
            .iter()
            .map(|(statistic, value)| Measurement {
                statistic: statistic.to_string(),
                value: *value,
            })
            .collect(),
        available_tags: tags
            .iter()
            .map(|(tag, values)| MetricTag {
                tag: tag.to_string(),
                values: values.iter().map(|v| v.to_string()).collect(),
            })
            .collect(),
        ..Default::default()
    }
}
