//! Prometheus metrics for monitoring.
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`install_recorder`] has been called, so library code and tests can
//! record unconditionally.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

use crate::error::{Error, ErrorKind, Result};

/// Install the global Prometheus recorder and return a handle for rendering.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {}", e)))
}

/// Methods counted under their own label. Everything else is `other`.
const KNOWN_METHODS: &[&str] = &[
    "initialize",
    "ping",
    "tools/list",
    "tools/call",
    "notifications/initialized",
    "notifications/cancelled",
];

/// Label for tool calls that named no registered tool.
pub const UNKNOWN_TOOL: &str = "unknown";

/// The bounded label value for a JSON-RPC method name.
pub fn method_label(method: &str) -> &'static str {
    KNOWN_METHODS
        .iter()
        .find(|known| **known == method)
        .copied()
        .unwrap_or("other")
}

/// Count one JSON-RPC message by method.
pub fn record_request(method: &str) {
    counter!("store_greeter_requests_total", "method" => method_label(method)).increment(1);
}

/// Count one tool invocation. `tool` must be a registered name or
/// [`UNKNOWN_TOOL`].
pub fn record_tool_call(tool: &str) {
    counter!("store_greeter_tool_calls_total", "tool" => tool.to_string()).increment(1);
}

/// Count one failed tool invocation.
pub fn record_tool_failure(tool: &str, kind: ErrorKind) {
    counter!(
        "store_greeter_tool_failures_total",
        "tool" => tool.to_string(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Count one weather lookup that fell back to the fixed phrase.
pub fn record_weather_fallback(reason: &'static str) {
    counter!("store_greeter_weather_fallbacks_total", "reason" => reason).increment(1);
}

/// Set the live session gauge.
pub fn set_active_sessions(count: usize) {
    gauge!("store_greeter_active_sessions").set(count as f64);
}

/// Timer for measuring durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Record the elapsed time as a tool latency sample.
    pub fn observe_tool(self, tool: &str) {
        histogram!("store_greeter_tool_duration_seconds", "tool" => tool.to_string())
            .record(self.start.elapsed().as_secs_f64());
    }
}
