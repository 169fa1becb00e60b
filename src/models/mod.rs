// Domain models: Actuator wire types, extension surface, derived stats, snapshots

mod actuator;
mod endpoint;
mod monitoring;
mod project;
mod snapshot;

pub use actuator::{
    AppInfo, ComponentHealth, Health, HealthStatus, Measurement, MetricDescriptor, MetricTag,
    MetricsList, statistic,
};
pub use endpoint::{EndpointMetric, HttpRequestSummary, JvmMemory, TrafficOverview, round2};
pub use monitoring::{
    Alert, AlertSeverity, BusinessMetric, ConversionFunnel, ConversionRates, DatabaseSection,
    ErrorDistribution, ExternalServiceMetric, JvmSection, LogEntry, LogLevel, LogQuery,
    PiStatusDistribution, SystemMetric,
};
pub use project::{Project, User};
pub use snapshot::{EndpointsSource, ProcessStats, ProjectOverview, ProjectSnapshot, ThreadStats};
