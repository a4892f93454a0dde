//! # Prometheus Metrics
//!
//! Submission counters, the global end-offset gauge and a latency histogram,
//! all held in a dedicated [`prometheus::Registry`] with the `permaseed`
//! prefix and served as text on `/metrics`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Label values for the `kind` dimension.
pub const KIND_TX: &str = "tx";
pub const KIND_CHUNK: &str = "chunk";
pub const KIND_BUNDLE_ITEM: &str = "bundle_item";

#[derive(Clone)]
pub struct SeedMetrics {
    registry: Registry,
    /// Accepted submissions, by `kind`.
    pub accepted_total: IntCounterVec,
    /// Rejected submissions, by `kind` and error `reason`.
    pub rejected_total: IntCounterVec,
    /// Current value of the global end-offset counter.
    pub end_offset: IntGauge,
    /// Wall time spent handling a submission, by `kind`.
    pub submission_latency_seconds: HistogramVec,
}

impl SeedMetrics {
    /// Create and register all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("permaseed".into()), None)?;

        let accepted_total = IntCounterVec::new(
            Opts::new("submissions_accepted_total", "Accepted submissions"),
            &["kind"],
        )?;
        registry.register(Box::new(accepted_total.clone()))?;

        let rejected_total = IntCounterVec::new(
            Opts::new("submissions_rejected_total", "Rejected submissions"),
            &["kind", "reason"],
        )?;
        registry.register(Box::new(rejected_total.clone()))?;

        let end_offset = IntGauge::new(
            "end_offset_bytes",
            "End of the node's global data-offset space",
        )?;
        registry.register(Box::new(end_offset.clone()))?;

        let submission_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "submission_latency_seconds",
                "Submission handling latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["kind"],
        )?;
        registry.register(Box::new(submission_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            accepted_total,
            rejected_total,
            end_offset,
            submission_latency_seconds,
        })
    }

    pub fn record_accepted(&self, kind: &str) {
        self.accepted_total.with_label_values(&[kind]).inc();
    }

    pub fn record_rejected(&self, kind: &str, reason: &str) {
        self.rejected_total.with_label_values(&[kind, reason]).inc();
    }

    pub fn observe_latency(&self, kind: &str, seconds: f64) {
        self.submission_latency_seconds
            .with_label_values(&[kind])
            .observe(seconds);
    }

    /// The gauge is signed; offsets past `i64::MAX` pin at the maximum.
    pub fn set_end_offset(&self, offset: u64) {
        self.end_offset
            .set(i64::try_from(offset).unwrap_or(i64::MAX));
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

pub type SharedMetrics = Arc<SeedMetrics>;

/// `GET /metrics`
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
