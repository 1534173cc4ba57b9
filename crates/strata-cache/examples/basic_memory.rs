//! Basic example demonstrating strata-cache with the memory adapter

use serde_json::{json, Map};
use std::sync::Arc;
use strata_cache::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== strata-cache Basic Example ===\n");

    // Register named configurations
    let registry = Arc::new(CacheRegistry::with_builtin());
    registry.register(
        "default",
        Configuration::builder("Memory")
            .option("prefix", "app:")
            .option("expiry", "+30 minutes")
            .build(),
    );
    registry.register(
        "sessions",
        Configuration::builder("Memory").scope("session").build(),
    );
    let cache = Cache::new(registry);

    println!("Enabled: {}", cache.enabled("default").await);

    // Store a batch
    let mut users = Map::new();
    users.insert("user:1".to_string(), json!({"name": "Alice", "email": "alice@example.com"}));
    users.insert("user:2".to_string(), json!({"name": "Bob", "email": "bob@example.com"}));
    println!("Storing users...");
    let stored = cache.write("default", users, Some(Expiry::expression("+5 minutes"))).await;
    println!("   Stored: {}", stored);

    // Read a batch; missing keys are simply absent
    let found = cache.read("default", &["user:1", "user:2", "user:3"]).await;
    println!("Found {} of 3 users", found.len());
    for (key, user) in &found {
        println!("   {} -> {}", key, user["name"]);
    }

    // Counters
    cache.write_one("default", "visits", 0, Some(Expiry::Persist)).await;
    cache.increment("default", "visits", 1).await;
    let visits = cache.increment("default", "visits", 10).await;
    println!("\nVisits: {:?}", visits);

    // Non-numeric values are left alone
    let inert = cache.increment("default", "user:1", 1).await;
    println!("Increment on an object: {:?}", inert);

    // Scoped configuration
    cache.write_one("sessions", "abc123", "user_data", Some(Expiry::Seconds(1800))).await;
    println!("\nSession: {:?}", cache.read_one("sessions", "abc123").await);

    // Stats
    if let Some(stats) = cache.stats("default").await {
        println!("\nCache Statistics:");
        println!("   Hits: {}", stats.hits);
        println!("   Misses: {}", stats.misses);
        println!("   Writes: {}", stats.writes);
        println!("   Hit Ratio: {:.2}%", stats.hit_ratio() * 100.0);
        println!("   Size: {} entries", stats.size);
    }

    // Delete and clear
    println!("\nDeleted user:1: {}", cache.delete("default", &["user:1"]).await);
    println!("Deleted user:1 again: {}", cache.delete("default", &["user:1"]).await);
    println!("Cleared: {}", cache.clear("default").await);

    // Unknown names are a no-op
    println!("Unknown config write: {}", cache.write_one("nope", "k", 1, None).await);

    println!("\n=== Example Complete ===");
    Ok(())
}
