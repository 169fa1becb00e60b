// Actuator endpoints: health, info, metric list, single metric views, Prometheus text

use super::{ApiClient, ApiRequest};
use crate::error::Result;
use crate::models::{AppInfo, Health, MetricDescriptor, MetricsList};
use crate::reconstruct::{HTTP_SERVER_REQUESTS, MetricSource};
use async_trait::async_trait;
use tracing::instrument;

/// `key:value` pairs comma-joined into the single `tag` parameter Actuator expects.
pub fn tag_param(tags: &[(&str, &str)]) -> String {
    tags.iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

impl ApiClient {
    /// GET /actuator/health. Public; the caller decides what a failure means.
    #[instrument(skip(self), fields(client = %self.base_url, operation = "health"))]
    pub async fn health(&self) -> Result<Health> {
        self.get_json(&ApiRequest::get("/actuator/health")).await
    }

    pub async fn info(&self) -> Result<AppInfo> {
        self.get_json(&ApiRequest::get("/actuator/info")).await
    }

    pub async fn metrics_list(&self) -> Result<MetricsList> {
        self.get_json(&ApiRequest::get("/actuator/metrics")).await
    }

    /// GET /actuator/metrics/{name}, filtered by `tags` when non-empty.
    #[instrument(skip(self), fields(client = %self.base_url, operation = "metric"))]
    pub async fn metric(&self, name: &str, tags: &[(&str, &str)]) -> Result<MetricDescriptor> {
        let mut req = ApiRequest::get(format!("/actuator/metrics/{}", name));
        if !tags.is_empty() {
            req = req.query("tag", tag_param(tags));
        }
        self.get_json(&req).await
    }

    pub async fn http_server_requests(&self, tags: &[(&str, &str)]) -> Result<MetricDescriptor> {
        self.metric(HTTP_SERVER_REQUESTS, tags).await
    }

    /// GET /actuator/prometheus as exposition text.
    pub async fn prometheus(&self) -> Result<String> {
        self.get_text(&ApiRequest::get("/actuator/prometheus").accept("text/plain"))
            .await
    }

    pub async fn jvm_memory_used(&self) -> Result<MetricDescriptor> {
        self.metric("jvm.memory.used", &[]).await
    }

    pub async fn jvm_memory_max(&self) -> Result<MetricDescriptor> {
        self.metric("jvm.memory.max", &[]).await
    }

    pub async fn jvm_memory_committed(&self) -> Result<MetricDescriptor> {
        self.metric("jvm.memory.committed", &[]).await
    }

    pub async fn jvm_threads_live(&self) -> Result<MetricDescriptor> {
        self.metric("jvm.threads.live", &[]).await
    }

    pub async fn jvm_threads_peak(&self) -> Result<MetricDescriptor> {
        self.metric("jvm.threads.peak", &[]).await
    }

    pub async fn process_uptime(&self) -> Result<MetricDescriptor> {
        self.metric("process.uptime", &[]).await
    }

    pub async fn process_cpu_usage(&self) -> Result<MetricDescriptor> {
        self.metric("process.cpu.usage", &[]).await
    }

    pub async fn jvm_gc_pause(&self) -> Result<MetricDescriptor> {
        self.metric("jvm.gc.pause", &[]).await
    }
}

#[async_trait]
impl MetricSource for ApiClient {
    async fn metric(&self, name: &str, tags: &[(&str, &str)]) -> Result<MetricDescriptor> {
        ApiClient::metric(self, name, tags).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_param_joins_pairs_in_order() {
        assert_eq!(
            tag_param(&[("uri", "/api/x"), ("method", "GET"), ("status", "500")]),
            "uri:/api/x,method:GET,status:500"
        );
        assert_eq!(tag_param(&[]), "");
    }
}
