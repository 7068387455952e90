//! Request instrumentation: a process-wide registry of request counters and
//! latency histograms, the middleware that feeds it, and a renderer for the
//! Prometheus text exposition format.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use thiserror::Error;

use crate::routes::AppState;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const REQUESTS_TOTAL: &str = "taskmanager_http_requests_total";
const REQUEST_LATENCY: &str = "taskmanager_request_latency_seconds";

/// Upper bounds, in seconds, of the latency histogram buckets. `+Inf` is implicit.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics registry lock poisoned")]
    LockPoisoned,

    #[error("format error: {0}")]
    Format(#[from] std::fmt::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RequestKey {
    method: String,
    endpoint: String,
    status: u16,
}

#[derive(Debug, Clone)]
struct Histogram {
    /// Per-bucket (non-cumulative) counts, parallel to `LATENCY_BUCKETS`.
    /// Samples above the last bound land in no bucket and only show up in
    /// `+Inf`, which is rendered from `count`.
    buckets: Vec<u64>,
    sum: f64,
    count: u64,
}

impl Histogram {
    fn new() -> Self {
        Self {
            buckets: vec![0; LATENCY_BUCKETS.len()],
            sum: 0.0,
            count: 0,
        }
    }

    fn observe(&mut self, seconds: f64) {
        if let Some(idx) = LATENCY_BUCKETS.iter().position(|le| seconds <= *le) {
            self.buckets[idx] += 1;
        }
        self.sum += seconds;
        self.count += 1;
    }
}

#[derive(Debug, Default)]
struct Series {
    requests: BTreeMap<RequestKey, u64>,
    latency: BTreeMap<String, Histogram>,
}

/// Shared, thread-safe metrics registry.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    series: Mutex<Series>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished request.
    pub fn observe(
        &self,
        method: &str,
        endpoint: &str,
        status: u16,
        elapsed: Duration,
    ) -> Result<(), MetricsError> {
        let mut series = self.series.lock().map_err(|_| MetricsError::LockPoisoned)?;
        series
            .latency
            .entry(endpoint.to_string())
            .or_insert_with(Histogram::new)
            .observe(elapsed.as_secs_f64());
        *series
            .requests
            .entry(RequestKey {
                method: method.to_string(),
                endpoint: endpoint.to_string(),
                status,
            })
            .or_insert(0) += 1;
        Ok(())
    }

    /// Current count for one (method, endpoint, status) triple.
    pub fn request_count(&self, method: &str, endpoint: &str, status: u16) -> u64 {
        let Ok(series) = self.series.lock() else {
            return 0;
        };
        series
            .requests
            .get(&RequestKey {
                method: method.to_string(),
                endpoint: endpoint.to_string(),
                status,
            })
            .copied()
            .unwrap_or(0)
    }

    /// Render every series in the Prometheus text format.
    pub fn render(&self) -> Result<String, MetricsError> {
        let series = self.series.lock().map_err(|_| MetricsError::LockPoisoned)?;
        let mut out = String::new();

        writeln!(out, "# HELP {REQUESTS_TOTAL} Total HTTP requests")?;
        writeln!(out, "# TYPE {REQUESTS_TOTAL} counter")?;
        for (key, count) in &series.requests {
            writeln!(
                out,
                "{REQUESTS_TOTAL}{{method=\"{}\",endpoint=\"{}\",http_status=\"{}\"}} {count}",
                escape_label(&key.method),
                escape_label(&key.endpoint),
                key.status,
            )?;
        }

        writeln!(out, "# HELP {REQUEST_LATENCY} HTTP request latency")?;
        writeln!(out, "# TYPE {REQUEST_LATENCY} histogram")?;
        for (endpoint, hist) in &series.latency {
            let endpoint = escape_label(endpoint);
            let mut cumulative = 0;
            for (le, n) in LATENCY_BUCKETS.iter().zip(&hist.buckets) {
                cumulative += n;
                writeln!(
                    out,
                    "{REQUEST_LATENCY}_bucket{{endpoint=\"{endpoint}\",le=\"{le:?}\"}} {cumulative}"
                )?;
            }
            writeln!(
                out,
                "{REQUEST_LATENCY}_bucket{{endpoint=\"{endpoint}\",le=\"+Inf\"}} {}",
                hist.count
            )?;
            writeln!(
                out,
                "{REQUEST_LATENCY}_sum{{endpoint=\"{endpoint}\"}} {:?}",
                hist.sum
            )?;
            writeln!(
                out,
                "{REQUEST_LATENCY}_count{{endpoint=\"{endpoint}\"}} {}",
                hist.count
            )?;
        }

        Ok(out)
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Axum middleware that times every request and records it, whatever the
/// handler returned. Recording problems are logged and otherwise ignored.
pub async fn track_metrics(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    if let Err(e) = state.metrics.observe(method.as_str(), &path, status, elapsed) {
        tracing::warn!("request metrics dropped: {e}");
    }
    tracing::debug!(
        %method,
        path = %path,
        status,
        latency_ms = elapsed.as_secs_f64() * 1000.0,
        "request handled"
    );

    response
}
