//! Prometheus metrics for tool invocations, served at `/metrics` in HTTP mode.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub tool: String,
    /// "success" or "error"
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub tool: String,
    pub error_type: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ToolLabels {
    pub tool: String,
}

pub struct MetricsCollector {
    registry: RwLock<Registry>,
    pub mcp_requests_total: Family<RequestLabels, Counter>,
    pub mcp_request_duration_seconds: Family<ToolLabels, Histogram>,
    pub mcp_active_requests: Family<ToolLabels, Gauge>,
    pub mcp_errors_total: Family<ErrorLabels, Counter>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let mcp_requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "mcp_requests_total",
            "Total number of MCP tool calls",
            mcp_requests_total.clone(),
        );

        let mcp_request_duration_seconds =
            Family::<ToolLabels, Histogram>::new_with_constructor(|| {
                // 50ms .. ~30s; every call is at least one Google round trip
                Histogram::new(exponential_buckets(0.05, 2.0, 10))
            });
        registry.register(
            "mcp_request_duration_seconds",
            "Tool call latency histogram in seconds",
            mcp_request_duration_seconds.clone(),
        );

        let mcp_active_requests = Family::<ToolLabels, Gauge>::default();
        registry.register(
            "mcp_active_requests",
            "Number of tool calls currently in flight",
            mcp_active_requests.clone(),
        );

        let mcp_errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "mcp_errors_total",
            "Total number of failed tool calls by error type",
            mcp_errors_total.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            mcp_requests_total,
            mcp_request_duration_seconds,
            mcp_active_requests,
            mcp_errors_total,
        }
    }

    /// Encode metrics in Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        if let Err(error) = encode(&mut buffer, &registry) {
            tracing::warn!(?error, "failed to encode metrics");
        }
        buffer
    }

    fn observe(&self, tool: &str, status: &str, duration: Duration) {
        self.mcp_requests_total
            .get_or_create(&RequestLabels {
                tool: tool.to_string(),
                status: status.to_string(),
            })
            .inc();
        self.mcp_request_duration_seconds
            .get_or_create(&ToolLabels {
                tool: tool.to_string(),
            })
            .observe(duration.as_secs_f64());
    }

    pub fn record_request_success(&self, tool: &str, duration: Duration) {
        self.observe(tool, "success", duration);
    }

    pub fn record_request_error(&self, tool: &str, duration: Duration, error_type: &str) {
        self.observe(tool, "error", duration);
        self.mcp_errors_total
            .get_or_create(&ErrorLabels {
                tool: tool.to_string(),
                error_type: error_type.to_string(),
            })
            .inc();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Times one tool call and keeps the in-flight gauge accurate.
///
/// A guard dropped without `success` or `error` counts as an error, which
/// covers calls cancelled by the client.
pub struct RequestMetrics {
    tool: String,
    start: Instant,
    completed: bool,
}

impl RequestMetrics {
    pub fn new(tool: &str) -> Self {
        METRICS
            .mcp_active_requests
            .get_or_create(&ToolLabels {
                tool: tool.to_string(),
            })
            .inc();
        Self {
            tool: tool.to_string(),
            start: Instant::now(),
            completed: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn success(mut self) {
        METRICS.record_request_success(&self.tool, self.start.elapsed());
        self.finish();
    }

    pub fn error(mut self, error_type: &str) {
        METRICS.record_request_error(&self.tool, self.start.elapsed(), error_type);
        self.finish();
    }

    fn finish(&mut self) {
        self.completed = true;
        METRICS
            .mcp_active_requests
            .get_or_create(&ToolLabels {
                tool: self.tool.clone(),
            })
            .dec();
    }
}

impl Drop for RequestMetrics {
    fn drop(&mut self) {
        if !self.completed {
            METRICS.record_request_error(&self.tool, self.start.elapsed(), "cancelled");
            self.finish();
        }
    }
}
