// Per-endpoint HTTP statistics and derived summaries

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{MetricDescriptor, statistic};

/// Request/error/latency figures for one (uri, method) pair.
///
/// Either reported by the backend's pre-aggregated endpoint or rebuilt from
/// filtered Actuator queries. Percentiles are only real when the backend
/// reports them; reconstructed values are derived from the average.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMetric {
    pub endpoint: String,
    pub method: String,
    #[serde(default)]
    pub request_count: u64,
    #[serde(default)]
    pub error_count: u64,
    /// Percent, two decimals.
    #[serde(default)]
    pub error_rate: f64,
    /// Milliseconds, two decimals.
    #[serde(default)]
    pub avg_response_time: f64,
    #[serde(default)]
    pub p50: f64,
    #[serde(default)]
    pub p95: f64,
    #[serde(default)]
    pub p99: f64,
    #[serde(default)]
    pub status_code_distribution: BTreeMap<String, u64>,
}

/// Totals across a list of endpoint metrics, as shown on the project overview.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficOverview {
    pub total_requests: u64,
    pub total_errors: u64,
    /// Percent.
    pub error_rate: f64,
    /// Milliseconds.
    pub avg_response_time: f64,
}

impl TrafficOverview {
    /// Sums counts; average latency is the unweighted mean of the endpoint averages.
    pub fn from_endpoints(endpoints: &[EndpointMetric]) -> Self {
        if endpoints.is_empty() {
            return Self::default();
        }
        let total_requests: u64 = endpoints.iter().map(|e| e.request_count).sum();
        let total_errors: u64 = endpoints.iter().map(|e| e.error_count).sum();
        let latency_sum: f64 = endpoints.iter().map(|e| e.avg_response_time).sum();
        Self {
            total_requests,
            total_errors,
            error_rate: percent(total_errors as f64, total_requests as f64),
            avg_response_time: latency_sum / endpoints.len() as f64,
        }
    }

    /// Totals straight from a base http.server.requests descriptor. Errors need
    /// separate status fetches; see `with_errors`.
    pub fn from_base(base: &MetricDescriptor) -> Self {
        let total = base.measurement_or_zero(statistic::COUNT);
        let total_time_secs = base.measurement_or_zero(statistic::TOTAL_TIME);
        Self {
            total_requests: total.round() as u64,
            total_errors: 0,
            error_rate: 0.0,
            avg_response_time: if total > 0.0 {
                total_time_secs / total * 1000.0
            } else {
                0.0
            },
        }
    }

    /// Same totals with `total_errors` set and the error rate derived from it.
    pub fn with_errors(self, total_errors: u64) -> Self {
        Self {
            total_errors,
            error_rate: percent(total_errors as f64, self.total_requests as f64),
            ..self
        }
    }
}

/// JVM heap+non-heap usage from jvm.memory.used / jvm.memory.max.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JvmMemory {
    pub used: f64,
    pub max: f64,
    pub percentage: f64,
    pub free: f64,
}

impl JvmMemory {
    pub fn from_descriptors(used: &MetricDescriptor, max: &MetricDescriptor) -> Self {
        let used = used.measurement_or_zero(statistic::VALUE);
        let max = max.measurement_or_zero(statistic::VALUE);
        Self {
            used,
            max,
            percentage: percent(used, max),
            free: max - used,
        }
    }
}

/// Shape of a base http.server.requests descriptor: total count plus the tag
/// values seen. Per-value counts stay zero until a filtered fetch fills them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestSummary {
    pub total: f64,
    pub by_method: BTreeMap<String, f64>,
    pub by_uri: BTreeMap<String, f64>,
    pub by_status: BTreeMap<String, f64>,
}

impl HttpRequestSummary {
    pub fn from_descriptor(base: &MetricDescriptor) -> Self {
        let zeroed = |tag: &str| -> BTreeMap<String, f64> {
            base.tag_values(tag)
                .unwrap_or(&[])
                .iter()
                .map(|v| (v.clone(), 0.0))
                .collect()
        };
        Self {
            total: base.measurement_or_zero(statistic::COUNT),
            by_method: zeroed("method"),
            by_uri: zeroed("uri"),
            by_status: zeroed("status"),
        }
    }
}

pub(crate) fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Round to two decimals, the precision every derived figure is reported with.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
