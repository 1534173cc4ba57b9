//! Metrics trait for cache observability

use std::time::Duration;

use crate::Method;

/// Trait for cache metrics/observability
///
/// Implement this to integrate with your metrics system (Prometheus, StatsD, etc.)
pub trait CacheMetrics: Send + Sync + 'static {
    /// Record keys found by a read
    fn record_hits(&self, config: &str, count: usize);

    /// Record keys a read did not find
    fn record_misses(&self, config: &str, count: usize);

    /// Record how long a call took, filters below the recorder included
    fn record_latency(&self, config: &str, method: Method, duration: Duration);

    /// Record a call that returned its negative result
    fn record_failure(&self, config: &str, method: Method);
}

/// No-op metrics implementation (default)
///
/// Zero overhead when metrics are not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    #[inline]
    fn record_hits(&self, _config: &str, _count: usize) {}

    #[inline]
    fn record_misses(&self, _config: &str, _count: usize) {}

    #[inline]
    fn record_latency(&self, _config: &str, _method: Method, _duration: Duration) {}

    #[inline]
    fn record_failure(&self, _config: &str, _method: Method) {}
}

/// Metrics adapter using the `metrics` crate
///
/// Integrates with Prometheus, StatsD, and other exporters via the `metrics` ecosystem.
///
/// # Example
/// ```ignore
/// use strata_cache_core::MetricsCrateAdapter;
///
/// // Set up a metrics recorder (e.g., prometheus_exporter)
/// // metrics::set_global_recorder(recorder);
///
/// let metrics = MetricsCrateAdapter::new("strata_cache");
/// // Emits: strata_cache_hits_total, strata_cache_misses_total, etc.
/// ```
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }
}

#[cfg(feature = "metrics")]
impl CacheMetrics for MetricsCrateAdapter {
    fn record_hits(&self, config: &str, count: usize) {
        metrics::counter!(self.metric_name("hits_total"), "config" => config.to_string())
            .increment(count as u64);
    }

    fn record_misses(&self, config: &str, count: usize) {
        metrics::counter!(self.metric_name("misses_total"), "config" => config.to_string())
            .increment(count as u64);
    }

    fn record_latency(&self, config: &str, method: Method, duration: Duration) {
        metrics::histogram!(
            self.metric_name("operation_duration_seconds"),
            "config" => config.to_string(),
            "method" => method.as_str()
        )
        .record(duration.as_secs_f64());
    }

    fn record_failure(&self, config: &str, method: Method) {
        metrics::counter!(
            self.metric_name("failures_total"),
            "config" => config.to_string(),
            "method" => method.as_str()
        )
        .increment(1);
    }
}
