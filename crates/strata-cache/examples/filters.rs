//! Wrapping adapter calls with filters

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_cache::prelude::*;
use strata_cache::{param, MemoryLog};

#[tokio::main]
async fn main() {
    println!("=== Filters ===\n");

    // A filter counting every call that reaches it
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let counting = filter_fn(move |ctx, params, next| {
        counted.fetch_add(1, Ordering::SeqCst);
        println!("   -> {} on {}", ctx.method.as_str(), ctx.config);
        Box::pin(next.run(params))
    });

    // A filter refusing writes of null values without touching the adapter
    let no_nulls = filter_fn(|ctx, params, next| {
        Box::pin(async move {
            let has_null = params.entries(param::ENTRIES).values().any(Value::is_null);
            if ctx.method == Method::Write && has_null {
                return Value::Bool(false);
            }
            next.run(params).await
        })
    });

    let registry = Arc::new(CacheRegistry::with_builtin());
    registry.register(
        "default",
        Configuration::builder("Memory")
            .filter(counting)
            .filter(Arc::new(CircuitBreaker::new(5, Duration::from_secs(30))))
            .filter(Arc::new(Coalesce::new()))
            .filter(no_nulls)
            .build(),
    );
    let cache = Cache::new(registry);

    println!("Write a value:");
    println!("   stored: {}", cache.write_one("default", "k", json!(1), None).await);

    println!("Write a null:");
    println!("   stored: {}", cache.write_one("default", "n", Value::Null, None).await);

    println!("Concurrent reads:");
    let (a, b) = tokio::join!(cache.read_one("default", "k"), cache.read_one("default", "k"));
    println!("   {:?} {:?}", a, b);

    println!("\nCalls through the chain: {}", calls.load(Ordering::SeqCst));

    // Log filters rewrite params the same way
    let sink = MemoryLog::default();
    let handle = sink.clone();
    let logs = Arc::new(LogRegistry::new());
    logs.factory("Buffer", move |_options| Ok(Arc::new(handle.clone()) as Arc<dyn LogAdapter>));
    logs.register(
        "app",
        Configuration::builder("Buffer")
            .filter(filter_fn(|_ctx, mut params, next| {
                Box::pin(async move {
                    let message = params.str(param::MESSAGE).unwrap_or_default().to_uppercase();
                    params.set(param::MESSAGE, message);
                    next.run(params).await
                })
            }))
            .build(),
    );
    let logger = Logger::new(logs);
    logger.notice("quiet message").await;
    println!("Logged: {:?}", sink.messages());
}
