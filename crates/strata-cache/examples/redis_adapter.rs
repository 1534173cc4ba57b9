//! Redis adapter example
//!
//! Requires a Redis server on 127.0.0.1:6379.
//! Run with `cargo run --example redis_adapter --features redis`.

use serde_json::json;
use std::sync::Arc;
use strata_cache::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(CacheRegistry::with_builtin());
    registry.register(
        "redis",
        Configuration::builder("Redis")
            .option("url", "redis://127.0.0.1:6379")
            .option("prefix", "example:")
            .option("pool_size", 4)
            .build(),
    );
    let cache = Cache::new(registry);

    if !cache.enabled("redis").await {
        println!("Redis is not reachable, start a server first");
        return Ok(());
    }

    cache.write_one("redis", "greeting", json!("hello"), Some(Expiry::Seconds(60))).await;
    cache.write_one("redis", "hits", 0, Some(Expiry::Persist)).await;

    println!("greeting: {:?}", cache.read_one("redis", "greeting").await);
    println!("hits: {:?}", cache.increment("redis", "hits", 5).await);
    println!("increment string: {:?}", cache.increment("redis", "greeting", 1).await);
    println!("delete: {}", cache.delete("redis", &["greeting", "hits"]).await);
    println!("clear: {}", cache.clear("redis").await);

    Ok(())
}
