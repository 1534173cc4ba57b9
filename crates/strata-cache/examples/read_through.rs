use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use strata_cache::prelude::*;

async fn load_user(id: u64) -> Result<Value> {
    println!("   (loading user {id} from the database)");
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(json!({"id": id, "name": format!("User {id}")}))
}

#[tokio::main]
async fn main() -> Result<()> {
    let registry = Arc::new(CacheRegistry::with_builtin());
    registry.register("users", Configuration::builder("Memory").scope("user").build());
    let cache = Cache::new(registry);

    for attempt in 1..=3 {
        let user = cache
            .remember("users", "42", Some(Expiry::expression("+10 minutes")), || load_user(42))
            .await?;
        println!("attempt {attempt}: {user}");
    }

    Ok(())
}
