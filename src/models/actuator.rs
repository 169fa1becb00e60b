// Spring Boot Actuator response models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Micrometer statistic names used by the monitor.
pub mod statistic {
    pub const COUNT: &str = "COUNT";
    pub const TOTAL_TIME: &str = "TOTAL_TIME";
    pub const MAX: &str = "MAX";
    pub const VALUE: &str = "VALUE";
}

/// Overall health reported by GET /actuator/health. Unknown strings map to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Up,
    Down,
    OutOfService,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<BTreeMap<String, ComponentHealth>>,
}

impl Health {
    /// Placeholder used when the health endpoint itself cannot be reached.
    pub fn down() -> Self {
        Self {
            status: HealthStatus::Down,
            components: None,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }
}

/// GET /actuator/info. Both sections are optional on the backend side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<serde_json::Value>,
}

/// GET /actuator/metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsList {
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub statistic: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTag {
    pub tag: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// GET /actuator/metrics/{name}[?tag=k:v,...]
///
/// Without a tag filter this is the "base" view: aggregate measurements plus every
/// tag value seen. With a filter the measurements cover only that combination.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_unit: Option<String>,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default)]
    pub available_tags: Vec<MetricTag>,
}

impl MetricDescriptor {
    /// Value of the first measurement with this statistic, if reported.
    pub fn measurement(&self, statistic: &str) -> Option<f64> {
        self.measurements
            .iter()
            .find(|m| m.statistic == statistic)
            .map(|m| m.value)
    }

    /// Like `measurement`, with a missing statistic read as zero.
    pub fn measurement_or_zero(&self, statistic: &str) -> f64 {
        self.measurement(statistic).unwrap_or(0.0)
    }

    pub fn tag_values(&self, tag: &str) -> Option<&[String]> {
        self.available_tags
            .iter()
            .find(|t| t.tag == tag)
            .map(|t| t.values.as_slice())
    }
}
