//! Configuration for the Redis adapter

use serde::{Deserialize, Serialize};
use std::time::Duration;

use strata_cache_core::Expiry;

/// Configuration for Redis adapter connection and behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,

    /// Connection pool size
    pub pool_size: u32,

    /// Connection timeout in milliseconds
    pub connection_timeout_ms: u64,

    /// Namespace prepended to every key (e.g., "myapp:")
    pub prefix: String,

    /// Expiry applied to writes that do not carry one
    pub expiry: Expiry,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
            connection_timeout_ms: 5_000,
            prefix: String::new(),
            expiry: Expiry::default(),
        }
    }
}

impl RedisConfig {
    /// Create new config with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set pool size
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set key prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set default expiry
    pub fn expiry(mut self, expiry: impl Into<Expiry>) -> Self {
        self.expiry = expiry.into();
        self
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: RedisConfig =
            serde_json::from_value(json!({"url": "redis://cache:6380", "prefix": "app:"})).unwrap();

        assert_eq!(config.url, "redis://cache:6380");
        assert_eq!(config.prefix, "app:");
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.expiry, Expiry::default());
        assert_eq!(config.connection_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_builder() {
        let config = RedisConfig::new("redis://localhost").pool_size(4).prefix("x:").expiry(60i64);
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.prefix, "x:");
        assert_eq!(config.expiry, Expiry::Seconds(60));
    }
}
