// /api/v1/monitoring/* extension endpoints. Backends may not implement any of them,
// so every call degrades to an empty placeholder instead of failing.

use super::{ApiClient, ApiRequest};
use crate::models::{
    Alert, BusinessMetric, ConversionFunnel, EndpointMetric, ErrorDistribution,
    ExternalServiceMetric, LogEntry, LogQuery, PiStatusDistribution, SystemMetric,
};
use serde::de::DeserializeOwned;
use tracing::debug;

const BASE: &str = "/api/v1/monitoring";

impl ApiClient {
    async fn optional<T: DeserializeOwned>(&self, req: ApiRequest) -> Option<T> {
        match self.get_json::<T>(&req).await {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(path = req.path(), error = %e, "monitoring endpoint unavailable");
                None
            }
        }
    }

    async fn optional_list<T: DeserializeOwned>(&self, req: ApiRequest) -> Vec<T> {
        self.optional::<Vec<T>>(req).await.unwrap_or_default()
    }

    pub async fn system_metrics(&self) -> Option<SystemMetric> {
        self.optional(ApiRequest::get(format!("{BASE}/system-metrics")))
            .await
    }

    /// Pre-aggregated per-endpoint metrics; the fast path before Actuator reconstruction.
    pub async fn api_metrics(&self, time_range: Option<&str>) -> Vec<EndpointMetric> {
        let mut req = ApiRequest::get(format!("{BASE}/api-metrics"));
        if let Some(range) = time_range {
            req = req.query("timeRange", range);
        }
        self.optional_list(req).await
    }

    pub async fn business_metrics(&self) -> Option<BusinessMetric> {
        self.optional(ApiRequest::get(format!("{BASE}/business-metrics")))
            .await
    }

    pub async fn conversion_funnel(&self) -> Option<ConversionFunnel> {
        self.optional(ApiRequest::get(format!("{BASE}/conversion-funnel")))
            .await
    }

    pub async fn pi_status_distribution(&self) -> Vec<PiStatusDistribution> {
        self.optional_list(ApiRequest::get(format!("{BASE}/pi-status-distribution")))
            .await
    }

    pub async fn jvm_metrics(&self) -> Option<serde_json::Value> {
        self.optional(ApiRequest::get(format!("{BASE}/jvm-metrics")))
            .await
    }

    pub async fn database_metrics(&self) -> Option<serde_json::Value> {
        self.optional(ApiRequest::get(format!("{BASE}/database-metrics")))
            .await
    }

    pub async fn external_service_metrics(&self) -> Vec<ExternalServiceMetric> {
        self.optional_list(ApiRequest::get(format!("{BASE}/external-service-metrics")))
            .await
    }

    pub async fn logs(&self, query: &LogQuery) -> Vec<LogEntry> {
        let mut req = ApiRequest::get(format!("{BASE}/logs"));
        if let Some(level) = query.level {
            req = req.query("level", level.as_str());
        }
        if let Some(limit) = query.limit {
            req = req.query("limit", limit.to_string());
        }
        if let Some(search) = &query.search {
            req = req.query("search", search.as_str());
        }
        self.optional_list(req).await
    }

    pub async fn log_stats(&self) -> Option<serde_json::Value> {
        self.optional(ApiRequest::get(format!("{BASE}/log-stats")))
            .await
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.optional_list(ApiRequest::get(format!("{BASE}/alerts")))
            .await
    }

    pub async fn alert_history(&self) -> Vec<Alert> {
        self.optional_list(ApiRequest::get(format!("{BASE}/alert-history")))
            .await
    }

    pub async fn error_distribution(&self) -> Vec<ErrorDistribution> {
        self.optional_list(ApiRequest::get(format!("{BASE}/error-distribution")))
            .await
    }

    pub async fn error_trends(&self) -> Vec<serde_json::Value> {
        self.optional_list(ApiRequest::get(format!("{BASE}/error-trends")))
            .await
    }
}
