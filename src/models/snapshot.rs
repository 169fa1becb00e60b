// Per-project polling result published to routes and WebSocket clients

use serde::{Deserialize, Serialize};

use super::{
    BusinessMetric, EndpointMetric, ExternalServiceMetric, Health, HttpRequestSummary, JvmMemory,
    SystemMetric, TrafficOverview,
};

/// Where the endpoint list of a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointsSource {
    /// Backend's pre-aggregated /api/v1/monitoring/api-metrics.
    Backend,
    /// Rebuilt from filtered Actuator queries.
    Reconstructed,
    /// Base COUNT spread evenly across uri x method. Display only.
    Estimated,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadStats {
    pub live: f64,
    pub peak: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStats {
    pub uptime_secs: f64,
    /// Fraction in [0, 1] as reported by process.cpu.usage.
    pub cpu_usage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    /// 100 when health is UP, else 0.
    pub score: u8,
    #[serde(flatten)]
    pub traffic: TrafficOverview,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub project_id: String,
    /// Milliseconds since the Unix epoch, taken when the cycle started.
    pub timestamp: u64,
    pub health: Health,
    pub overview: ProjectOverview,
    #[serde(default)]
    pub endpoints: Vec<EndpointMetric>,
    #[serde(default)]
    pub endpoints_source: EndpointsSource,
    /// Tag values seen on the unfiltered http.server.requests meter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_summary: Option<HttpRequestSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jvm_memory: Option<JvmMemory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<ThreadStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business: Option<BusinessMetric>,
    #[serde(default)]
    pub external_services: Vec<ExternalServiceMetric>,
}
