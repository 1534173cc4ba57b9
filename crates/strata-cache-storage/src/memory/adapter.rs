//! In-process cache adapter using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use strata_cache_core::{
    CacheAdapter, CacheEntry, CacheError, CacheStats, Entries, Expiry, Result, Ttl,
};

use super::ttl_index::TtlIndex;

/// Longest TTL the expiration wheel covers before wrapping
const WHEEL_HORIZON: Duration = Duration::from_secs(86_400);

/// Runtime context the adapter is embedded in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Long-running service process
    #[default]
    Server,
    /// Short-lived command line process
    Cli,
}

/// Configuration for the memory adapter
///
/// Deserialized from a configuration's options map; missing fields take
/// their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Namespace prepended to every key
    pub prefix: String,
    /// Expiry applied to writes that do not carry one
    pub expiry: Expiry,
    /// Maximum number of entries in the store (0 = unlimited)
    pub capacity: usize,
    /// Availability in server processes
    pub enabled: bool,
    /// Availability in command line processes
    pub enable_cli: bool,
    /// Runtime context used by `enabled()`
    pub mode: RuntimeMode,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            expiry: Expiry::default(),
            capacity: 10_000,
            enabled: true,
            enable_cli: false,
            mode: RuntimeMode::Server,
        }
    }
}

impl MemoryConfig {
    /// Create config with a key prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    /// Create config with unlimited capacity
    pub fn unlimited() -> Self {
        Self {
            capacity: 0,
            ..Default::default()
        }
    }
}

/// Internal statistics tracking
#[derive(Debug, Default)]
struct MemoryStats {
    hits: u64,
    misses: u64,
    writes: u64,
    deletes: u64,
    evictions: u64,
}

/// Process-wide entry storage
///
/// Cloning creates a new handle to the SAME underlying store, so several
/// adapters with different prefixes can share one.
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<DashMap<String, CacheEntry>>,
    ttl_index: Arc<RwLock<TtlIndex>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            ttl_index: Arc::new(RwLock::new(TtlIndex::new(Duration::from_secs(1), WHEEL_HORIZON))),
        }
    }

    /// Number of entries across every prefix, expired ones included
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn remove(&self, key: &str) -> Option<CacheEntry> {
        let removed = self.data.remove(key).map(|(_, entry)| entry);
        if removed.is_some() {
            self.ttl_index.write().remove(key);
        }
        removed
    }
}

/// In-memory cache adapter
///
/// Uses `DashMap` for concurrent access and `TtlIndex` for efficient
/// expiration. Expired entries are never returned; they are dropped lazily
/// on access and in bulk by [`MemoryAdapter::cleanup_expired`].
#[derive(Clone)]
pub struct MemoryAdapter {
    store: MemoryStore,
    stats: Arc<RwLock<MemoryStats>>,
    config: MemoryConfig,
}

impl MemoryAdapter {
    /// Create an adapter over a private store
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_store(config, MemoryStore::new())
    }

    /// Create an adapter over a shared store
    pub fn with_store(config: MemoryConfig, store: MemoryStore) -> Self {
        Self {
            store,
            stats: Arc::new(RwLock::new(MemoryStats::default())),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MemoryConfig::default())
    }

    /// Build from a configuration's options map
    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        let config: MemoryConfig = serde_json::from_value(Value::Object(options.clone()))
            .map_err(|e| CacheError::Configuration {
                name: "Memory".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Handle to the underlying store
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    /// Evict entries under this adapter's prefix if at capacity
    ///
    /// Expired entries go first; other tenants of a shared store are never
    /// touched.
    fn maybe_evict(&self, incoming: &str) {
        let capacity = self.config.capacity;
        if capacity == 0 || self.store.data.len() < capacity {
            return;
        }
        if self.store.data.contains_key(incoming) {
            return;
        }

        let prefix = &self.config.prefix;
        let (mut expired, mut live) = (Vec::new(), Vec::new());
        for entry in self.store.data.iter().filter(|e| e.key().starts_with(prefix)) {
            if entry.is_expired() {
                expired.push(entry.key().clone());
            } else {
                live.push(entry.key().clone());
            }
        }

        let held = expired.len() + live.len();
        if held < capacity {
            return;
        }

        for key in expired.into_iter().chain(live).take(held + 1 - capacity) {
            if self.store.remove(&key).is_some() {
                self.stats.write().evictions += 1;
            }
        }
    }

    /// Fetch a live entry, dropping it if it has expired
    fn live(&self, key: &str) -> Option<Value> {
        let entry = self.store.data.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.store.remove(key);
            self.stats.write().evictions += 1;
            return None;
        }
        Some(entry.value.clone())
    }

    /// Read-modify-write under the entry lock
    fn apply_offset(&self, key: &str, offset: i64) -> Option<i64> {
        let key = self.key(key);
        let mut entry = self.store.data.get_mut(&key)?;
        if entry.is_expired() {
            drop(entry);
            self.store.remove(&key);
            return None;
        }

        let current = entry.value.as_i64()?;
        let Some(updated) = current.checked_add(offset) else {
            tracing::warn!(target: "strata_cache", key = %key, offset, "counter overflow");
            return None;
        };
        entry.value = Value::from(updated);
        Some(updated)
    }

    /// Run TTL cleanup and return number of expired entries removed
    ///
    /// Entries whose TTL outlived the wheel are rescheduled for their
    /// remaining lifetime.
    pub fn cleanup_expired(&self) -> usize {
        let due = self.store.ttl_index.write().tick();
        let mut count = 0;

        for key in due {
            let Some(entry) = self.store.data.get(&key) else {
                continue;
            };
            if entry.is_expired() {
                drop(entry);
                if self.store.remove(&key).is_some() {
                    self.stats.write().evictions += 1;
                    count += 1;
                }
            } else if let Some(remaining) = entry.ttl_remaining() {
                drop(entry);
                self.store.ttl_index.write().schedule(key, remaining);
            }
        }

        count
    }

    /// Run [`MemoryAdapter::cleanup_expired`] on an interval
    ///
    /// Must be called from within a tokio runtime. Abort the returned handle
    /// to stop the task.
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let adapter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = adapter.cleanup_expired();
                if removed > 0 {
                    tracing::debug!(target: "strata_cache", removed, "expired entries reclaimed");
                }
            }
        })
    }

    /// Number of entries under this adapter's prefix
    pub fn len(&self) -> usize {
        if self.config.prefix.is_empty() {
            return self.store.data.len();
        }
        self.store
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(&self.config.prefix))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheAdapter for MemoryAdapter {
    async fn write(&self, entries: Entries, expiry: Option<Expiry>) -> bool {
        let ttl = match Expiry::resolve(expiry.as_ref(), &self.config.expiry) {
            Ok(ttl) => ttl,
            Err(e) => {
                tracing::warn!(target: "strata_cache", error = %e, "write rejected");
                return false;
            }
        };

        if ttl.is_expired() {
            for key in entries.keys() {
                self.store.remove(&self.key(key));
            }
            return true;
        }

        for (key, value) in entries {
            let key = self.key(&key);
            self.maybe_evict(&key);

            match ttl {
                Ttl::Seconds(secs) => {
                    self.store
                        .ttl_index
                        .write()
                        .schedule(key.clone(), Duration::from_secs(secs as u64));
                }
                Ttl::Persist => self.store.ttl_index.write().remove(&key),
            }

            self.store.data.insert(key, CacheEntry::from_ttl(value, ttl));
            self.stats.write().writes += 1;
        }

        true
    }

    async fn read(&self, keys: &[String]) -> Entries {
        let mut found = Map::new();
        let (mut hits, mut misses) = (0, 0);

        for key in keys {
            match self.live(&self.key(key)) {
                Some(value) => {
                    found.insert(key.clone(), value);
                    hits += 1;
                }
                None => misses += 1,
            }
        }

        let mut stats = self.stats.write();
        stats.hits += hits;
        stats.misses += misses;
        found
    }

    async fn delete(&self, keys: &[String]) -> bool {
        let mut failed = 0;
        for key in keys {
            match self.store.remove(&self.key(key)) {
                Some(entry) if !entry.is_expired() => self.stats.write().deletes += 1,
                _ => failed += 1,
            }
        }
        failed == 0
    }

    async fn increment(&self, key: &str, offset: i64) -> Option<i64> {
        self.apply_offset(key, offset)
    }

    async fn decrement(&self, key: &str, offset: i64) -> Option<i64> {
        self.apply_offset(key, offset.checked_neg()?)
    }

    async fn clear(&self) -> bool {
        let prefix = &self.config.prefix;
        if prefix.is_empty() {
            self.store.data.clear();
            self.store.ttl_index.write().clear();
        } else {
            self.store.data.retain(|key, _| !key.starts_with(prefix));
            self.store.ttl_index.write().retain(|key| !key.starts_with(prefix));
        }
        true
    }

    async fn enabled(&self) -> bool {
        match self.config.mode {
            RuntimeMode::Server => self.config.enabled,
            RuntimeMode::Cli => self.config.enable_cli,
        }
    }

    async fn stats(&self) -> Option<CacheStats> {
        let stats = self.stats.read();
        Some(CacheStats {
            hits: stats.hits,
            misses: stats.misses,
            writes: stats.writes,
            deletes: stats.deletes,
            evictions: stats.evictions,
            size: self.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(value: Value) -> Entries {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let adapter = MemoryAdapter::with_defaults();

        assert!(adapter.write(entries(json!({"a": 1, "b": "two"})), None).await);

        let found = adapter.read(&keys(&["a", "b"])).await;
        assert_eq!(Value::Object(found), json!({"a": 1, "b": "two"}));
    }

    #[tokio::test]
    async fn test_read_omits_missing_keys_and_keeps_request_order() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"a": 1, "c": 3})), None).await;

        let found = adapter.read(&keys(&["c", "missing", "a"])).await;
        assert_eq!(found.keys().collect::<Vec<_>>(), vec!["c", "a"]);
        assert!(!found.contains_key("missing"));
    }

    #[tokio::test]
    async fn test_non_positive_ttl_removes_key() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"a": 1})), Some(Expiry::Persist)).await;

        assert!(adapter.write(entries(json!({"a": 2})), Some(Expiry::Seconds(0))).await);
        assert!(adapter.read(&keys(&["a"])).await.is_empty());

        assert!(adapter.write(entries(json!({"b": 2})), Some(Expiry::Seconds(-10))).await);
        assert!(adapter.read(&keys(&["b"])).await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_expression_expires_immediately() {
        let adapter = MemoryAdapter::with_defaults();
        let past = Some(Expiry::expression("2001-01-01 00:00:00"));

        assert!(adapter.write(entries(json!({"a": 1})), past).await);
        assert!(adapter.read(&keys(&["a"])).await.is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_expiry_fails_write() {
        let adapter = MemoryAdapter::with_defaults();
        let bad = Some(Expiry::expression("whenever you like"));

        assert!(!adapter.write(entries(json!({"a": 1})), bad).await);
        assert!(adapter.read(&keys(&["a"])).await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_entry_survives() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"a": 1})), Some(Expiry::Persist)).await;

        assert_eq!(adapter.read(&keys(&["a"])).await.get("a"), Some(&json!(1)));
        assert!(!adapter.store().ttl_index.read().contains("a"));
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"a": 1})), Some(Expiry::Seconds(1))).await;
        assert_eq!(adapter.read(&keys(&["a"])).await.len(), 1);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(adapter.read(&keys(&["a"])).await.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"a": 1})), Some(Expiry::Seconds(1))).await;
        adapter.write(entries(json!({"b": 1})), Some(Expiry::Persist)).await;

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(adapter.cleanup_expired(), 1);
        assert_eq!(adapter.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"a": 1, "b": 2})), None).await;

        assert!(adapter.delete(&keys(&["a", "b"])).await);
        assert!(adapter.read(&keys(&["a", "b"])).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_key_fails() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"a": 1})), None).await;

        assert!(!adapter.delete(&keys(&["a", "missing"])).await);
        // the present key is still removed
        assert!(adapter.read(&keys(&["a"])).await.is_empty());
    }

    #[tokio::test]
    async fn test_increment_and_decrement() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"n": 10})), None).await;

        assert_eq!(adapter.increment("n", 1).await, Some(11));
        assert_eq!(adapter.increment("n", 5).await, Some(16));
        assert_eq!(adapter.decrement("n", 6).await, Some(10));
        assert_eq!(adapter.read(&keys(&["n"])).await.get("n"), Some(&json!(10)));
    }

    #[tokio::test]
    async fn test_counter_on_missing_or_non_numeric_is_inert() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"s": "abc", "f": 1.5})), None).await;

        assert_eq!(adapter.increment("missing", 1).await, None);
        assert_eq!(adapter.increment("s", 1).await, None);
        assert_eq!(adapter.decrement("f", 1).await, None);

        let found = adapter.read(&keys(&["s", "f", "missing"])).await;
        assert_eq!(Value::Object(found), json!({"s": "abc", "f": 1.5}));
    }

    #[tokio::test]
    async fn test_counter_overflow_is_inert() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"n": i64::MAX})), None).await;

        assert_eq!(adapter.increment("n", 1).await, None);
        assert_eq!(adapter.decrement("n", i64::MIN).await, None);
        assert_eq!(adapter.read(&keys(&["n"])).await.get("n"), Some(&json!(i64::MAX)));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_atomic() {
        let adapter = Arc::new(MemoryAdapter::with_defaults());
        adapter.write(entries(json!({"n": 0})), None).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let adapter = adapter.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    adapter.increment("n", 1).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(adapter.read(&keys(&["n"])).await.get("n"), Some(&json!(800)));
    }

    #[tokio::test]
    async fn test_prefix_isolates_shared_store() {
        let store = MemoryStore::new();
        let users = MemoryAdapter::with_store(MemoryConfig::with_prefix("users:"), store.clone());
        let posts = MemoryAdapter::with_store(MemoryConfig::with_prefix("posts:"), store.clone());

        users.write(entries(json!({"1": "ada"})), None).await;
        posts.write(entries(json!({"1": "hello"})), None).await;
        assert_eq!(store.len(), 2);

        assert_eq!(users.read(&keys(&["1"])).await.get("1"), Some(&json!("ada")));

        assert!(users.clear().await);
        assert!(users.read(&keys(&["1"])).await.is_empty());
        assert_eq!(posts.read(&keys(&["1"])).await.get("1"), Some(&json!("hello")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"a": 1, "b": 2})), None).await;
        assert_eq!(adapter.len(), 2);

        assert!(adapter.clear().await);
        assert!(adapter.is_empty());
    }

    #[tokio::test]
    async fn test_enabled_follows_runtime_mode() {
        assert!(MemoryAdapter::with_defaults().enabled().await);

        let cli = MemoryConfig {
            mode: RuntimeMode::Cli,
            ..Default::default()
        };
        assert!(!MemoryAdapter::new(cli.clone()).enabled().await);

        let cli_enabled = MemoryConfig {
            enable_cli: true,
            ..cli
        };
        assert!(MemoryAdapter::new(cli_enabled).enabled().await);
    }

    #[tokio::test]
    async fn test_stats() {
        let adapter = MemoryAdapter::with_defaults();
        adapter.write(entries(json!({"a": 1})), None).await;
        adapter.read(&keys(&["a", "missing"])).await;
        adapter.delete(&keys(&["a"])).await;

        let stats = adapter.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.size, 0);
    }

    #[tokio::test]
    async fn test_capacity_eviction() {
        let config = MemoryConfig {
            capacity: 2,
            ..Default::default()
        };
        let adapter = MemoryAdapter::new(config);

        adapter.write(entries(json!({"a": 1, "b": 2})), None).await;
        adapter.write(entries(json!({"c": 3})), None).await;

        assert_eq!(adapter.len(), 2);
        assert_eq!(adapter.stats().await.unwrap().evictions, 1);
        assert_eq!(adapter.read(&keys(&["c"])).await.get("c"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_capacity_is_per_prefix() {
        let store = MemoryStore::new();
        let posts = MemoryAdapter::with_store(
            MemoryConfig {
                capacity: 0,
                ..MemoryConfig::with_prefix("posts:")
            },
            store.clone(),
        );
        let users = MemoryAdapter::with_store(
            MemoryConfig {
                capacity: 1,
                ..MemoryConfig::with_prefix("users:")
            },
            store.clone(),
        );

        posts.write(entries(json!({"1": "hello"})), Some(Expiry::Persist)).await;
        users.write(entries(json!({"1": "ada"})), None).await;
        users.write(entries(json!({"2": "grace"})), None).await;

        assert_eq!(posts.read(&keys(&["1"])).await.get("1"), Some(&json!("hello")));
        assert_eq!(users.len(), 1);
        assert_eq!(users.read(&keys(&["2"])).await.get("2"), Some(&json!("grace")));
        assert_eq!(users.stats().await.unwrap().evictions, 1);
        assert_eq!(posts.stats().await.unwrap().evictions, 0);
    }

    #[tokio::test]
    async fn test_capacity_evicts_expired_entries_first() {
        let adapter = MemoryAdapter::new(MemoryConfig {
            capacity: 2,
            ..Default::default()
        });

        adapter.write(entries(json!({"short": 1})), Some(Expiry::Seconds(1))).await;
        adapter.write(entries(json!({"kept": 2})), Some(Expiry::Persist)).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;

        adapter.write(entries(json!({"new": 3})), None).await;

        let found = adapter.read(&keys(&["kept", "new"])).await;
        assert_eq!(Value::Object(found), json!({"kept": 2, "new": 3}));
        assert_eq!(adapter.len(), 2);
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let adapter = MemoryAdapter::new(MemoryConfig {
            capacity: 1,
            ..Default::default()
        });

        adapter.write(entries(json!({"a": 1})), None).await;
        adapter.write(entries(json!({"a": 2})), None).await;

        assert_eq!(adapter.stats().await.unwrap().evictions, 0);
        assert_eq!(adapter.read(&keys(&["a"])).await.get("a"), Some(&json!(2)));
    }

    #[test]
    fn test_from_options() {
        let options = entries(json!({
            "prefix": "app:",
            "expiry": 300,
            "mode": "cli",
            "enable_cli": true
        }));
        let adapter = MemoryAdapter::from_options(&options).unwrap();

        assert_eq!(adapter.config().prefix, "app:");
        assert_eq!(adapter.config().expiry, Expiry::Seconds(300));
        assert_eq!(adapter.config().mode, RuntimeMode::Cli);
        assert_eq!(adapter.config().capacity, 10_000);
    }

    #[test]
    fn test_from_options_rejects_bad_types() {
        let options = entries(json!({"capacity": "lots"}));
        let err = MemoryAdapter::from_options(&options).err().unwrap();
        assert!(matches!(err, CacheError::Configuration { .. }));
    }
}
