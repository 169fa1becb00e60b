// Rebuilds per-(uri, method) request stats from Micrometer's one-filter-per-request
// metric endpoint. Sub-fetch failures count as zero; records are only returned whole.

use crate::error::Result;
use crate::models::{EndpointMetric, MetricDescriptor, round2, statistic};
use async_trait::async_trait;
use futures_util::{FutureExt, StreamExt, future, stream};
use std::collections::BTreeMap;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

pub const HTTP_SERVER_REQUESTS: &str = "http.server.requests";

/// Synthetic status value tried first for the error count. Backends that do not
/// support it fail the fetch, which triggers the per-status sum.
const ERROR_STATUS_WILDCARD: &str = "4xx";

/// Latency percentiles are not exposed by summary-type meters. These multipliers of
/// the average are a display approximation only, not measured values.
const P50_FACTOR: f64 = 1.0;
const P95_FACTOR: f64 = 1.5;
const P99_FACTOR: f64 = 2.0;

/// Anything that can answer `GET /actuator/metrics/{name}?tag=...`.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn metric(&self, name: &str, tags: &[(&str, &str)]) -> Result<MetricDescriptor>;
}

/// Full reconstruction from a base (unfiltered) `http.server.requests` descriptor.
///
/// Issues one filtered fetch per (uri, method) plus one per known status. At most
/// `max_concurrency` fetches are in flight across the whole pass. Output is sorted
/// by (endpoint, method).
#[instrument(skip(source, base), fields(operation = "reconstruct"))]
pub async fn reconstruct<S>(
    source: &S,
    base: &MetricDescriptor,
    max_concurrency: usize,
) -> Vec<EndpointMetric>
where
    S: MetricSource + ?Sized,
{
    let (Some(uris), Some(methods)) = (base.tag_values("uri"), base.tag_values("method")) else {
        debug!("base descriptor has no uri/method tags; nothing to reconstruct");
        return Vec::new();
    };
    let statuses = base.tag_values("status").unwrap_or(&[]);
    let gate = Gate::new(source, max_concurrency);

    let lookups: Vec<_> = uris
        .iter()
        .flat_map(|u| methods.iter().map(move |m| (u.as_str(), m.as_str())))
        .map(|(uri, method)| endpoint_metric(&gate, uri, method, statuses).boxed())
        .collect();
    let width = pool_width(lookups.len(), max_concurrency);

    let mut out: Vec<EndpointMetric> = stream::iter(lookups)
        .buffer_unordered(width)
        .filter_map(future::ready)
        .collect()
        .await;
    out.sort_by(|a, b| (&a.endpoint, &a.method).cmp(&(&b.endpoint, &b.method)));
    out
}

/// Service-wide error total: COUNT for every numeric status >= 400 listed on the base
/// descriptor, each fetched with a status-only filter. Failed fetches count as zero.
#[instrument(skip(source, base), fields(operation = "error_total"))]
pub async fn error_total<S>(source: &S, base: &MetricDescriptor, max_concurrency: usize) -> u64
where
    S: MetricSource + ?Sized,
{
    let gate = Gate::new(source, max_concurrency);
    let counts: Vec<_> = base
        .tag_values("status")
        .unwrap_or(&[])
        .iter()
        .filter(|status| is_error_status(status))
        .map(|status| {
            let gate = &gate;
            async move {
                match gate.fetch(&[("status", status.as_str())]).await {
                    Ok(d) => d.measurement_or_zero(statistic::COUNT),
                    Err(e) => {
                        debug!(status = %status, error = %e, "status count unavailable");
                        0.0
                    }
                }
            }
            .boxed()
        })
        .collect();
    let total: f64 = future::join_all(counts).await.into_iter().sum();
    total.round() as u64
}

/// Degraded estimate: the base COUNT spread evenly over every (uri, method) pair,
/// all other figures zero. For display when follow-up fetches are not wanted.
pub fn estimate(base: &MetricDescriptor) -> Vec<EndpointMetric> {
    let (Some(uris), Some(methods)) = (base.tag_values("uri"), base.tag_values("method")) else {
        return Vec::new();
    };
    let cells = uris.len() * methods.len();
    if cells == 0 {
        return Vec::new();
    }
    let per_cell = (base.measurement_or_zero(statistic::COUNT) / cells as f64).round() as u64;
    uris.iter()
        .flat_map(|uri| {
            methods.iter().map(move |method| EndpointMetric {
                endpoint: uri.clone(),
                method: method.clone(),
                request_count: per_cell,
                ..Default::default()
            })
        })
        .collect()
}

fn pool_width(items: usize, max_concurrency: usize) -> usize {
    items.clamp(1, max_concurrency.max(1))
}

/// Filtered `http.server.requests` fetches behind one shared permit pool.
struct Gate<'a, S: ?Sized> {
    source: &'a S,
    permits: Semaphore,
}

impl<'a, S> Gate<'a, S>
where
    S: MetricSource + ?Sized,
{
    fn new(source: &'a S, max_concurrency: usize) -> Self {
        Self {
            source,
            permits: Semaphore::new(max_concurrency.max(1)),
        }
    }

    async fn fetch(&self, tags: &[(&str, &str)]) -> Result<MetricDescriptor> {
        // Never closed, so the permit is always granted.
        let _permit = self.permits.acquire().await;
        self.source.metric(HTTP_SERVER_REQUESTS, tags).await
    }
}

async fn endpoint_metric<S>(
    gate: &Gate<'_, S>,
    uri: &str,
    method: &str,
    statuses: &[String],
) -> Option<EndpointMetric>
where
    S: MetricSource + ?Sized,
{
    let filtered = match gate.fetch(&[("uri", uri), ("method", method)]).await {
        Ok(d) => d,
        Err(e) => {
            debug!(uri, method, error = %e, "filtered metric unavailable; skipping endpoint");
            return None;
        }
    };

    let request_count = filtered.measurement_or_zero(statistic::COUNT);
    if request_count <= 0.0 {
        return None;
    }
    let total_time_secs = filtered.measurement_or_zero(statistic::TOTAL_TIME);
    let avg_ms = total_time_secs / request_count * 1000.0;

    let (wildcard_errors, distribution) = tokio::join!(
        count_for(gate, uri, method, ERROR_STATUS_WILDCARD),
        status_distribution(gate, uri, method, statuses),
    );
    let error_count = wildcard_errors.unwrap_or_else(|| error_count_from(&distribution));
    let error_rate = error_count / request_count * 100.0;

    Some(EndpointMetric {
        endpoint: uri.to_string(),
        method: method.to_string(),
        request_count: request_count.round() as u64,
        error_count: error_count.round() as u64,
        error_rate: round2(error_rate),
        avg_response_time: round2(avg_ms),
        p50: round2(avg_ms * P50_FACTOR),
        p95: round2(avg_ms * P95_FACTOR),
        p99: round2(avg_ms * P99_FACTOR),
        status_code_distribution: distribution
            .into_iter()
            .map(|(status, count)| (status, count.round() as u64))
            .collect(),
    })
}

/// COUNT for one (uri, method, status) combination, or None if the fetch failed.
async fn count_for<S>(gate: &Gate<'_, S>, uri: &str, method: &str, status: &str) -> Option<f64>
where
    S: MetricSource + ?Sized,
{
    match gate
        .fetch(&[("uri", uri), ("method", method), ("status", status)])
        .await
    {
        Ok(d) => d.measurement(statistic::COUNT),
        Err(e) => {
            debug!(uri, method, status, error = %e, "status count unavailable");
            None
        }
    }
}

/// COUNT per known status. Statuses whose fetch fails are left out.
async fn status_distribution<S>(
    gate: &Gate<'_, S>,
    uri: &str,
    method: &str,
    statuses: &[String],
) -> BTreeMap<String, f64>
where
    S: MetricSource + ?Sized,
{
    let counts: Vec<_> = statuses
        .iter()
        .map(|status| {
            async move {
                count_for(gate, uri, method, status)
                    .await
                    .map(|count| (status.clone(), count))
            }
            .boxed()
        })
        .collect();
    future::join_all(counts).await.into_iter().flatten().collect()
}

fn is_error_status(status: &str) -> bool {
    status.parse::<u16>().is_ok_and(|code| code >= 400)
}

/// Sum of counts for numeric statuses >= 400.
fn error_count_from(distribution: &BTreeMap<String, f64>) -> f64 {
    distribution
        .iter()
        .filter(|(status, _)| is_error_status(status))
        .map(|(_, count)| count)
        .sum()
}
