use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use parking_lot::RwLock as SyncRwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

use strata_cache_core::{
    CacheAdapter, CacheError, CacheStats, Entries, Expiry, Result, Ttl,
};

use super::config::RedisConfig;

/// Adds to a counter only if the key holds an integer; nil otherwise
const INCRBY_EXISTING: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current or not string.match(current, '^%-?%d+$') then
    return false
end
return redis.call('INCRBY', KEYS[1], ARGV[1])
"#;

/// Redis cache adapter
///
/// Values are stored as JSON text, so integers are plain Redis integers
/// and counters use `INCRBY` directly.
#[derive(Clone)]
pub struct RedisAdapter {
    pool: Pool<RedisConnectionManager>,
    config: RedisConfig,
    stats: Arc<SyncRwLock<CacheStats>>,
}

impl RedisAdapter {
    /// Connect and verify the pool can hand out a connection
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout())
            .build(manager)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self::with_pool(pool, config))
    }

    /// Create without connecting; connections are opened on first use
    ///
    /// Must be called from within a tokio runtime.
    pub fn lazy(config: RedisConfig) -> Result<Self> {
        let manager = RedisConnectionManager::new(config.url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout())
            .build_unchecked(manager);

        Ok(Self::with_pool(pool, config))
    }

    /// Build lazily from a configuration's options map
    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        let config: RedisConfig = serde_json::from_value(Value::Object(options.clone()))
            .map_err(|e| CacheError::Configuration {
                name: "Redis".to_string(),
                reason: e.to_string(),
            })?;
        Self::lazy(config)
    }

    fn with_pool(pool: Pool<RedisConnectionManager>, config: RedisConfig) -> Self {
        Self {
            pool,
            config,
            stats: Arc::new(SyncRwLock::new(CacheStats::default())),
        }
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Get prefix for a key
    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    /// Get connection from pool
    async fn get_connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }

    async fn try_write(&self, entries: Entries, ttl: Ttl) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.get_connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();

        for (key, value) in &entries {
            let prefixed = self.prefixed_key(key);
            match ttl {
                Ttl::Seconds(secs) if secs <= 0 => {
                    pipe.del(&prefixed).ignore();
                }
                Ttl::Seconds(secs) => {
                    let serialized = serde_json::to_string(value)
                        .map_err(|e| CacheError::Serialization(e.to_string()))?;
                    pipe.set_ex(&prefixed, serialized, secs as u64).ignore();
                }
                Ttl::Persist => {
                    let serialized = serde_json::to_string(value)
                        .map_err(|e| CacheError::Serialization(e.to_string()))?;
                    pipe.set(&prefixed, serialized).ignore();
                }
            }
        }

        pipe.query_async::<()>(&mut *conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        if !ttl.is_expired() {
            self.stats.write().writes += entries.len() as u64;
        }
        Ok(())
    }

    async fn try_read(&self, keys: &[String]) -> Result<Entries> {
        let mut found = Map::new();
        if keys.is_empty() {
            return Ok(found);
        }

        let mut conn = self.get_connection().await?;
        let prefixed: Vec<String> = keys.iter().map(|k| self.prefixed_key(k)).collect();
        let raw: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&prefixed)
            .query_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        for (key, text) in keys.iter().zip(raw) {
            let Some(text) = text else { continue };
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => {
                    found.insert(key.clone(), value);
                }
                Err(e) => {
                    tracing::warn!(target: "strata_cache", key = %key, error = %e, "undecodable value skipped");
                }
            }
        }

        let mut stats = self.stats.write();
        stats.hits += found.len() as u64;
        stats.misses += (keys.len() - found.len()) as u64;
        Ok(found)
    }

    /// Returns how many keys were not removed
    async fn try_delete(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.get_connection().await?;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.del(self.prefixed_key(key));
        }

        let removed: Vec<i64> = pipe
            .query_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        let deleted = removed.iter().filter(|count| **count > 0).count();
        self.stats.write().deletes += deleted as u64;
        Ok(keys.len() - deleted)
    }

    async fn try_offset(&self, key: &str, offset: i64) -> Result<Option<i64>> {
        let mut conn = self.get_connection().await?;
        redis::cmd("EVAL")
            .arg(INCRBY_EXISTING)
            .arg(1)
            .arg(self.prefixed_key(key))
            .arg(offset)
            .query_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn try_clear(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let match_pattern = format!("{}*", escape_pattern(&self.config.prefix));

        // Scan and delete
        let mut cursor = 0u64;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(&match_pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;

            if !keys.is_empty() {
                redis::cmd("UNLINK")
                    .arg(&keys)
                    .query_async::<usize>(&mut *conn)
                    .await
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(())
    }

    /// Count keys under this adapter's prefix
    ///
    /// Scans the keyspace, so this is O(N) on large databases.
    pub async fn len(&self) -> Result<usize> {
        let mut conn = self.get_connection().await?;

        if self.config.prefix.is_empty() {
            return redis::cmd("DBSIZE")
                .query_async(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()));
        }

        let match_pattern = format!("{}*", escape_pattern(&self.config.prefix));
        let mut cursor = 0u64;
        let mut count = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(&match_pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;

            count += keys.len();
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(count)
    }
}

/// Escape glob metacharacters so a prefix matches literally in `SCAN MATCH`
fn escape_pattern(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn warn_failed(method: &str, error: &CacheError) {
    tracing::warn!(target: "strata_cache", adapter = "redis", method, error = %error, "backend call failed");
}

#[async_trait]
impl CacheAdapter for RedisAdapter {
    async fn write(&self, entries: Entries, expiry: Option<Expiry>) -> bool {
        let ttl = match Expiry::resolve(expiry.as_ref(), &self.config.expiry) {
            Ok(ttl) => ttl,
            Err(e) => {
                warn_failed("write", &e);
                return false;
            }
        };
        match self.try_write(entries, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn_failed("write", &e);
                false
            }
        }
    }

    async fn read(&self, keys: &[String]) -> Entries {
        self.try_read(keys).await.unwrap_or_else(|e| {
            warn_failed("read", &e);
            Map::new()
        })
    }

    async fn delete(&self, keys: &[String]) -> bool {
        match self.try_delete(keys).await {
            Ok(failed) => failed == 0,
            Err(e) => {
                warn_failed("delete", &e);
                false
            }
        }
    }

    async fn increment(&self, key: &str, offset: i64) -> Option<i64> {
        self.try_offset(key, offset).await.unwrap_or_else(|e| {
            warn_failed("increment", &e);
            None
        })
    }

    async fn decrement(&self, key: &str, offset: i64) -> Option<i64> {
        let offset = offset.checked_neg()?;
        self.try_offset(key, offset).await.unwrap_or_else(|e| {
            warn_failed("decrement", &e);
            None
        })
    }

    async fn clear(&self) -> bool {
        match self.try_clear().await {
            Ok(()) => true,
            Err(e) => {
                warn_failed("clear", &e);
                false
            }
        }
    }

    async fn enabled(&self) -> bool {
        let Ok(mut conn) = self.get_connection().await else {
            return false;
        };
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .is_ok()
    }

    async fn stats(&self) -> Option<CacheStats> {
        let mut stats = self.stats.read().clone();
        stats.size = self.len().await.unwrap_or(0);
        Some(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_pattern() {
        assert_eq!(escape_pattern("app:"), "app:");
        assert_eq!(escape_pattern("a*b?[c]"), "a\\*b\\?\\[c\\]");
    }

    #[tokio::test]
    async fn test_from_options_is_lazy() {
        let options = match json!({"url": "redis://127.0.0.1:1", "prefix": "t:"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        // nothing listens on port 1; construction must still succeed
        let adapter = RedisAdapter::from_options(&options).unwrap();
        assert_eq!(adapter.prefixed_key("k"), "t:k");
    }

    #[test]
    fn test_from_options_rejects_bad_url() {
        let mut options = Map::new();
        options.insert("url".to_string(), json!("not a url"));
        assert!(RedisAdapter::from_options(&options).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_backend_yields_negative_results() {
        let config = RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connection_timeout_ms: 200,
            ..Default::default()
        };
        let adapter = RedisAdapter::lazy(config).unwrap();
        let entries = match json!({"a": 1}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        assert!(!adapter.enabled().await);
        assert!(!adapter.write(entries, None).await);
        assert!(adapter.read(&["a".to_string()]).await.is_empty());
        assert_eq!(adapter.increment("a", 1).await, None);
    }

    // The tests below need a live server; run with
    // `REDIS_URL=redis://127.0.0.1:6379 cargo test --features redis -- --ignored`
    async fn live_adapter(prefix: &str) -> RedisAdapter {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let adapter = RedisAdapter::connect(RedisConfig::new(url).prefix(prefix))
            .await
            .expect("redis server reachable");
        adapter.clear().await;
        adapter
    }

    fn object(value: Value) -> Entries {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_live_counter_only_touches_integers() {
        let adapter = live_adapter("strata-test:counter:").await;
        adapter
            .write(object(json!({"n": 10, "quoted": "10", "f": 1.5})), Some(Expiry::Seconds(60)))
            .await;

        assert_eq!(adapter.increment("n", 5).await, Some(15));
        assert_eq!(adapter.decrement("n", 20).await, Some(-5));
        assert_eq!(adapter.increment("quoted", 1).await, None);
        assert_eq!(adapter.increment("f", 1).await, None);
        assert_eq!(adapter.increment("missing", 1).await, None);

        let keys = ["n", "quoted", "f", "missing"].map(String::from);
        let found = adapter.read(&keys).await;
        assert_eq!(Value::Object(found), json!({"n": -5, "quoted": "10", "f": 1.5}));

        adapter.clear().await;
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_live_delete_missing_key_fails() {
        let adapter = live_adapter("strata-test:delete:").await;
        adapter.write(object(json!({"a": 1, "b": 2})), None).await;

        assert!(adapter.delete(&["a".to_string()]).await);
        assert!(!adapter.delete(&["b".to_string(), "missing".to_string()]).await);
        assert!(adapter.read(&["b".to_string()]).await.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_live_clear_keeps_other_prefixes() {
        let users = live_adapter("strata-test:users:").await;
        let posts = live_adapter("strata-test:posts:").await;
        users.write(object(json!({"1": "ada"})), None).await;
        posts.write(object(json!({"1": "hello"})), None).await;

        assert!(users.clear().await);
        assert!(users.read(&["1".to_string()]).await.is_empty());
        assert_eq!(posts.read(&["1".to_string()]).await.get("1"), Some(&json!("hello")));

        posts.clear().await;
    }
}
