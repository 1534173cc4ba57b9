use crate::{CacheMetrics, Method};
use std::time::Duration;
use tracing::{debug, warn};

/// Metrics adapter that logs events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    /// Service name/prefix (optional)
    service_name: Option<String>,
}

impl TracingMetrics {
    /// Create new tracing metrics adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with service name prefix
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl CacheMetrics for TracingMetrics {
    fn record_hits(&self, config: &str, count: usize) {
        debug!(
            target: "strata_cache",
            event = "hit",
            config = %config,
            count = count,
            service = ?self.service_name,
            "Cache Hit"
        );
    }

    fn record_misses(&self, config: &str, count: usize) {
        debug!(
            target: "strata_cache",
            event = "miss",
            config = %config,
            count = count,
            service = ?self.service_name,
            "Cache Miss"
        );
    }

    fn record_latency(&self, config: &str, method: Method, duration: Duration) {
        tracing::trace!(
            target: "strata_cache",
            event = "latency",
            config = %config,
            method = method.as_str(),
            duration_ms = duration.as_millis(),
            service = ?self.service_name,
            "Cache Operation Latency"
        );
    }

    fn record_failure(&self, config: &str, method: Method) {
        warn!(
            target: "strata_cache",
            event = "failure",
            config = %config,
            method = method.as_str(),
            service = ?self.service_name,
            "Cache Operation Failed"
        );
    }
}
