use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use strata_cache_core::{param, CacheMetrics, Context, Filter, Method, Next, Params};

/// Filter reporting every call to a [`CacheMetrics`] recorder
///
/// Records latency for all methods, hits and misses for reads and a
/// failure for any other call that returns `false`. Place it first in the
/// filter list to time the whole chain.
pub struct MetricsFilter<M: CacheMetrics> {
    metrics: Arc<M>,
}

impl<M: CacheMetrics> Clone for MetricsFilter<M> {
    fn clone(&self) -> Self {
        Self {
            metrics: self.metrics.clone(),
        }
    }
}

impl<M: CacheMetrics> MetricsFilter<M> {
    pub fn new(metrics: M) -> Self {
        Self {
            metrics: Arc::new(metrics),
        }
    }

    /// Shared recorder
    pub fn metrics(&self) -> &Arc<M> {
        &self.metrics
    }
}

#[async_trait]
impl<M: CacheMetrics> Filter for MetricsFilter<M> {
    async fn apply(&self, ctx: &Context, params: Params, next: Next<'_>) -> Value {
        let requested = match ctx.method {
            Method::Read => params.strings(param::KEYS).len(),
            _ => 0,
        };

        let start = Instant::now();
        let result = next.run(params).await;
        self.metrics
            .record_latency(&ctx.config, ctx.method, start.elapsed());

        match (ctx.method, &result) {
            (Method::Read, Value::Object(found)) => {
                let hits = found.len();
                self.metrics.record_hits(&ctx.config, hits);
                self.metrics
                    .record_misses(&ctx.config, requested.saturating_sub(hits));
            }
            (Method::Read, _) => self.metrics.record_misses(&ctx.config, requested),
            (method, Value::Bool(false)) => self.metrics.record_failure(&ctx.config, method),
            _ => {}
        }

        result
    }
}
