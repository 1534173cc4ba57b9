use serde_json::json;
use std::sync::Arc;
use strata_cache::prelude::*;
use strata_cache::TracingMetrics;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing subscriber
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE) // Enable TRACE to see latency logs
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CacheError::Internal(e.to_string()))?;

    // 2. Cache configuration reporting through TracingMetrics
    let metrics = TracingMetrics::new().with_service_name("example-service");
    let registry = Arc::new(CacheRegistry::with_builtin());
    registry.register(
        "default",
        Configuration::builder("Memory")
            .filter(Arc::new(MetricsFilter::new(metrics)))
            .build(),
    );
    let cache = Cache::new(registry);

    // 3. Logger writing to tracing
    let logs = Arc::new(LogRegistry::with_builtin());
    logs.register("console", Configuration::builder("Tracing").build());
    let logger = Logger::new(logs);

    logger.info("writing value").await;
    cache.write_one("default", "user:1", json!("Alice"), Some(Expiry::Seconds(60))).await;

    logger.info("reading value (hit)").await;
    let hit = cache.read_one("default", "user:1").await;
    logger.debug(&format!("got {:?}", hit)).await;

    logger.info("reading value (miss)").await;
    let miss = cache.read_one("default", "user:99").await;
    logger.debug(&format!("got {:?}", miss)).await;

    logger.warning("done, check the structured output above").await;
    Ok(())
}
