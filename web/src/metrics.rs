//! Prometheus metrics for the session server.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Once;
use std::time::Instant;
use tracing::warn;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ========== Session Lifecycle ==========

    pub static ref SESSIONS_CREATED: IntCounter = IntCounter::with_opts(
        Opts::new("web_sessions_created_total", "Total sessions created")
    ).unwrap();

    pub static ref SESSIONS_WAITING: IntGauge = IntGauge::with_opts(
        Opts::new("web_sessions_waiting", "Sessions waiting for stakes")
    ).unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = IntGauge::with_opts(
        Opts::new("web_sessions_active", "Sessions currently in play")
    ).unwrap();

    pub static ref SESSIONS_FINISHED: IntCounter = IntCounter::with_opts(
        Opts::new("web_sessions_finished_total", "Total sessions finished")
    ).unwrap();

    /// Stale Waiting sessions removed by the cleanup task
    pub static ref SESSIONS_EXPIRED: IntCounter = IntCounter::with_opts(
        Opts::new("web_sessions_expired_total", "Total waiting sessions expired")
    ).unwrap();

    // ========== Staking & Play ==========

    pub static ref STAKES_RECORDED: IntCounter = IntCounter::with_opts(
        Opts::new("web_stakes_recorded_total", "Total confirmed stakes recorded")
    ).unwrap();

    pub static ref MOVES_PLAYED: IntCounter = IntCounter::with_opts(
        Opts::new("web_moves_played_total", "Total moves played across all sessions")
    ).unwrap();

    // ========== Request Latency ==========

    /// HTTP request latency by endpoint and method
    pub static ref REQUEST_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new("web_request_duration_seconds", "HTTP request latency")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["endpoint", "method"]
    ).unwrap();
}

static INIT: Once = Once::new();

/// Register all metrics with the registry. Safe to call more than once.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY.register(Box::new(SESSIONS_CREATED.clone())).unwrap();
        REGISTRY.register(Box::new(SESSIONS_WAITING.clone())).unwrap();
        REGISTRY.register(Box::new(SESSIONS_ACTIVE.clone())).unwrap();
        REGISTRY
            .register(Box::new(SESSIONS_FINISHED.clone()))
            .unwrap();
        REGISTRY.register(Box::new(SESSIONS_EXPIRED.clone())).unwrap();
        REGISTRY.register(Box::new(STAKES_RECORDED.clone())).unwrap();
        REGISTRY.register(Box::new(MOVES_PLAYED.clone())).unwrap();
        REGISTRY
            .register(Box::new(REQUEST_LATENCY.clone()))
            .unwrap();
    });
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Route middleware recording request latency, labelled by route template.
pub async fn track_latency(req: Request, next: Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().to_string();

    let start = Instant::now();
    let response = next.run(req).await;
    REQUEST_LATENCY
        .with_label_values(&[endpoint.as_str(), method.as_str()])
        .observe(start.elapsed().as_secs_f64());
    response
}
