//! Cache facade

use serde_json::{Map, Value};
use std::sync::Arc;

use strata_cache_core::{
    outcome, param, CacheAdapter, CacheStats, Context, Entries, Expiry, FilterChain, Method,
    Operation, Params,
};

use crate::registry::{AdaptableRegistry, Configuration};

mod read_through;

/// Registry of cache adapters
pub type CacheRegistry = AdaptableRegistry<dyn CacheAdapter>;

impl AdaptableRegistry<dyn CacheAdapter> {
    /// Registry with factories for the adapters compiled in
    ///
    /// - `"Memory"`: [`strata_cache_storage::MemoryAdapter`] (feature `memory`)
    /// - `"Redis"`: [`strata_cache_storage::RedisAdapter`] (feature `redis`)
    pub fn with_builtin() -> Self {
        let registry = Self::new();

        #[cfg(feature = "memory")]
        registry.factory("Memory", |options| {
            let adapter = strata_cache_storage::MemoryAdapter::from_options(options)?;
            Ok(Arc::new(adapter) as Arc<dyn CacheAdapter>)
        });

        #[cfg(feature = "redis")]
        registry.factory("Redis", |options| {
            let adapter = strata_cache_storage::RedisAdapter::from_options(options)?;
            Ok(Arc::new(adapter) as Arc<dyn CacheAdapter>)
        });

        registry
    }
}

/// Entry point for cache calls against named configurations
///
/// Every call resolves its configuration by name and runs the adapter
/// method through the configuration's filters. An unregistered name, or an
/// adapter that cannot be built, yields the method's negative result:
/// `false`, an empty map or `None`.
#[derive(Clone)]
pub struct Cache {
    registry: Arc<CacheRegistry>,
}

impl Cache {
    pub fn new(registry: Arc<CacheRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    /// Resolve `name` and run `method` through its filter chain
    async fn run(&self, name: &str, method: Method, params: Params) -> Value {
        let Some(config) = self.registry.config(name) else {
            return method.negative();
        };
        let adapter = match self.registry.adapter(name) {
            Ok(adapter) => adapter,
            Err(e) => {
                tracing::error!(target: "strata_cache", config = %name, error = %e, "cache adapter unavailable");
                return method.negative();
            }
        };

        let ctx = Context::new(name, method);
        let operation = Operation::prepare(adapter, method);
        FilterChain::run(&ctx, params, &operation, &config.filters).await
    }

    /// Store every pair with the same expiry; `None` uses the adapter default
    pub async fn write(&self, name: &str, entries: Entries, expiry: Option<Expiry>) -> bool {
        let config = self.registry.config(name);
        let scope = Scope::of(config.as_deref());

        let mut params = Params::new().with(param::ENTRIES, scope.entries(entries));
        if let Some(expiry) = expiry {
            params.set(param::EXPIRY, expiry.to_value());
        }
        outcome::into_bool(self.run(name, Method::Write, params).await)
    }

    /// Store a single value
    pub async fn write_one(
        &self,
        name: &str,
        key: &str,
        value: impl Into<Value>,
        expiry: Option<Expiry>,
    ) -> bool {
        let mut entries = Map::new();
        entries.insert(key.to_string(), value.into());
        self.write(name, entries, expiry).await
    }

    /// Fetch the subset of `keys` that is present
    pub async fn read<K: AsRef<str>>(&self, name: &str, keys: &[K]) -> Entries {
        let config = self.registry.config(name);
        let scope = Scope::of(config.as_deref());

        let params = Params::new().with(param::KEYS, scope.keys(keys));
        let found = outcome::into_entries(self.run(name, Method::Read, params).await);
        scope.strip(found)
    }

    /// Fetch a single value
    pub async fn read_one(&self, name: &str, key: &str) -> Option<Value> {
        self.read(name, &[key]).await.remove(key)
    }

    /// Remove every key; `true` only if all of them were removed
    pub async fn delete<K: AsRef<str>>(&self, name: &str, keys: &[K]) -> bool {
        let config = self.registry.config(name);
        let scope = Scope::of(config.as_deref());

        let params = Params::new().with(param::KEYS, scope.keys(keys));
        outcome::into_bool(self.run(name, Method::Delete, params).await)
    }

    /// Atomically add `offset`; `None` when the value is absent or not an integer
    pub async fn increment(&self, name: &str, key: &str, offset: i64) -> Option<i64> {
        self.counter(name, Method::Increment, key, offset).await
    }

    /// Atomically subtract `offset`; same rules as [`Cache::increment`]
    pub async fn decrement(&self, name: &str, key: &str, offset: i64) -> Option<i64> {
        self.counter(name, Method::Decrement, key, offset).await
    }

    async fn counter(&self, name: &str, method: Method, key: &str, offset: i64) -> Option<i64> {
        let config = self.registry.config(name);
        let scope = Scope::of(config.as_deref());

        let params = Params::new()
            .with(param::KEY, scope.key(key))
            .with(param::OFFSET, offset);
        outcome::into_counter(self.run(name, method, params).await)
    }

    /// Drop every entry of the configuration's adapter
    pub async fn clear(&self, name: &str) -> bool {
        outcome::into_bool(self.run(name, Method::Clear, Params::new()).await)
    }

    /// Whether the configuration's backend is usable right now
    ///
    /// Probes the adapter directly, without filters.
    pub async fn enabled(&self, name: &str) -> bool {
        if self.registry.config(name).is_none() {
            return false;
        }
        match self.registry.adapter(name) {
            Ok(adapter) => adapter.enabled().await,
            Err(_) => false,
        }
    }

    /// Activity counters of the configuration's adapter, if it keeps any
    pub async fn stats(&self, name: &str) -> Option<CacheStats> {
        self.registry.config(name)?;
        self.registry.adapter(name).ok()?.stats().await
    }
}

/// Key namespace of a configuration
struct Scope<'a>(Option<&'a str>);

impl<'a> Scope<'a> {
    fn of(config: Option<&'a Configuration>) -> Self {
        Scope(config.and_then(|c| c.scope.as_deref()))
    }

    fn key(&self, key: &str) -> String {
        match self.0 {
            Some(scope) => format!("{scope}:{key}"),
            None => key.to_string(),
        }
    }

    fn keys<K: AsRef<str>>(&self, keys: &[K]) -> Vec<Value> {
        keys.iter().map(|k| Value::String(self.key(k.as_ref()))).collect()
    }

    fn entries(&self, entries: Entries) -> Entries {
        if self.0.is_none() {
            return entries;
        }
        entries.into_iter().map(|(k, v)| (self.key(&k), v)).collect()
    }

    /// Remove the namespace from result keys; foreign keys are dropped
    fn strip(&self, found: Entries) -> Entries {
        let Some(scope) = self.0 else {
            return found;
        };
        let prefix = format!("{scope}:");
        found
            .into_iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|k| (k.to_string(), v)))
            .collect()
    }
}
