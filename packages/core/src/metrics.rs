//! Prometheus metrics registry for the medication tracker.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it
//! to the HTTP middleware and the medications API state.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// HTTP request count, labelled by method, path, and status code.
    pub http_requests_total: CounterVec,
    /// HTTP request latency histogram in seconds.
    pub http_request_duration: Histogram,
    /// Total OpenFDA drug-info lookups attempted (cache misses only).
    pub drug_info_lookups_total: Counter,
    /// Failed OpenFDA drug-info lookups.
    pub drug_info_lookup_errors_total: Counter,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated (should not happen in practice).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("medtracker_http_requests_total", "HTTP requests served"),
            &["method", "path", "status"],
        )?;

        let http_request_duration = Histogram::with_opts(HistogramOpts::new(
            "medtracker_http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;

        let drug_info_lookups_total = Counter::with_opts(Opts::new(
            "medtracker_drug_info_lookups_total",
            "OpenFDA drug-info lookups attempted",
        ))?;

        let drug_info_lookup_errors_total = Counter::with_opts(Opts::new(
            "medtracker_drug_info_lookup_errors_total",
            "Failed OpenFDA drug-info lookups",
        ))?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(drug_info_lookups_total.clone()))?;
        registry.register(Box::new(drug_info_lookup_errors_total.clone()))?;

        Ok(Self {
            http_requests_total,
            http_request_duration,
            drug_info_lookups_total,
            drug_info_lookup_errors_total,
            registry,
        })
    }

    /// Render all registered metrics in Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}

/// Axum middleware recording per-request count and latency.
pub async fn track_http(
    State(metrics): State<Arc<AppMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    metrics
        .http_requests_total
        .with_label_values(&[&method, &path, response.status().as_str()])
        .inc();
    metrics
        .http_request_duration
        .observe(started.elapsed().as_secs_f64());

    response
}
