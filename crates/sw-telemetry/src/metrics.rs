//! Prometheus metrics for seekwire.
//!
//! All metrics follow the naming convention: `sw_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., transport_spawns_total)
//! - **Gauge**: Value that can go up or down (e.g., rpc_pending)
//! - **Histogram**: Distribution of values (e.g., rpc_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts,
    HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // TRANSPORT METRICS
    // =========================================================================

    /// Subprocess spawn attempts
    pub static ref TRANSPORT_SPAWNS: CounterVec = CounterVec::new(
        Opts::new("sw_transport_spawns_total", "Subprocess spawn attempts"),
        &["outcome"]  // outcome: ready/spawn_failed/handshake_failed
    ).expect("metric creation failed");

    /// Subprocess exits observed while it was expected to be running
    pub static ref TRANSPORT_EXITS: Counter = Counter::new(
        "sw_transport_exits_total",
        "Subprocess exits detected by the watcher"
    ).expect("metric creation failed");

    // =========================================================================
    // RPC METRICS
    // =========================================================================

    /// Calls by method and outcome
    pub static ref RPC_CALLS: CounterVec = CounterVec::new(
        Opts::new("sw_rpc_calls_total", "JSON-RPC calls issued"),
        &["method", "outcome"]  // outcome: ok/rpc_error/transport_error
    ).expect("metric creation failed");

    /// Calls awaiting a reply
    pub static ref RPC_PENDING: Gauge = Gauge::new(
        "sw_rpc_pending",
        "Calls awaiting a reply"
    ).expect("metric creation failed");

    /// Round-trip time by method
    pub static ref RPC_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "sw_rpc_duration_seconds",
            "Time from send to reply"
        ).buckets(exponential_buckets(0.001, 2.0, 16).expect("bucket layout")),
        &["method"]
    ).expect("metric creation failed");

    /// Lines and replies the channel had to drop
    pub static ref PROTOCOL_ERRORS: CounterVec = CounterVec::new(
        Opts::new("sw_protocol_errors_total", "Dropped inbound traffic"),
        &["kind"]  // kind: unparsable/malformed/stale_reply
    ).expect("metric creation failed");

    // =========================================================================
    // SESSION METRICS
    // =========================================================================

    /// Sessions currently held
    pub static ref SESSIONS_ACTIVE: Gauge = Gauge::new(
        "sw_sessions_active",
        "Search sessions currently cached"
    ).expect("metric creation failed");

    /// Sessions removed before the caller finished with them
    pub static ref SESSION_EVICTIONS: CounterVec = CounterVec::new(
        Opts::new("sw_session_evictions_total", "Search sessions evicted"),
        &["reason"]  // reason: ttl/capacity
    ).expect("metric creation failed");

    /// Pages served, fresh or from cache
    pub static ref PAGES_SERVED: CounterVec = CounterVec::new(
        Opts::new("sw_pages_served_total", "Result pages served"),
        &["source"]  // source: fresh/cursor
    ).expect("metric creation failed");

    // =========================================================================
    // TOOL SERVER METRICS
    // =========================================================================

    /// Tool invocations handled by the server
    pub static ref TOOL_CALLS: CounterVec = CounterVec::new(
        Opts::new("sw_tool_calls_total", "Tool invocations handled"),
        &["tool", "outcome"]  // outcome: ok/tool_error/invalid_params
    ).expect("metric creation failed");

    /// Time spent inside a tool handler
    pub static ref TOOL_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "sw_tool_duration_seconds",
            "Time spent handling one tool call"
        ).buckets(exponential_buckets(0.0005, 2.0, 16).expect("bucket layout"))
    ).expect("metric creation failed");
}

/// Handle to the global metrics registry.
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Render the registry in the Prometheus text format.
    pub fn gather(&self) -> Result<String, TelemetryError> {
        encode(&self.registry)
    }
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(TRANSPORT_SPAWNS.clone()),
        Box::new(TRANSPORT_EXITS.clone()),
        Box::new(RPC_CALLS.clone()),
        Box::new(RPC_PENDING.clone()),
        Box::new(RPC_DURATION.clone()),
        Box::new(PROTOCOL_ERRORS.clone()),
        Box::new(SESSIONS_ACTIVE.clone()),
        Box::new(SESSION_EVICTIONS.clone()),
        Box::new(PAGES_SERVED.clone()),
        Box::new(TOOL_CALLS.clone()),
        Box::new(TOOL_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Register (if needed) and render every metric in the Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    register_metrics()?.gather()
}

fn encode(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}
