//! Named configurations and memoized adapter instances

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use strata_cache_core::{CacheError, Filter, PrioritySet, Result};

/// Constructor options and extra settings of a configuration
pub type Options = Map<String, Value>;

/// Builds an adapter from a configuration's options
pub type Factory<A> = Arc<dyn Fn(&Options) -> Result<Arc<A>> + Send + Sync>;

/// A named bundle of adapter type, options and filters
#[derive(Clone)]
pub struct Configuration {
    /// Type identifier resolved through the registry's factories
    pub adapter: String,
    /// Options handed to the adapter factory
    pub options: Options,
    /// Interceptors wrapped around every call, outermost first
    pub filters: Vec<Arc<dyn Filter>>,
    /// Cache key namespace, or log scope for log configurations
    pub scope: Option<String>,
    /// Priorities a log configuration accepts
    pub priority: PrioritySet,
    /// Settings that are not adapter options
    pub extra: Options,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("adapter", &self.adapter)
            .field("options", &self.options)
            .field("filters", &self.filters.len())
            .field("scope", &self.scope)
            .field("priority", &self.priority)
            .field("extra", &self.extra)
            .finish()
    }
}

impl Configuration {
    /// Start building a configuration for the adapter type `adapter`
    pub fn builder(adapter: impl Into<String>) -> ConfigurationBuilder {
        ConfigurationBuilder {
            config: Configuration {
                adapter: adapter.into(),
                options: Options::new(),
                filters: Vec::new(),
                scope: None,
                priority: PrioritySet::All,
                extra: Options::new(),
            },
        }
    }
}

/// Builder for [`Configuration`]
pub struct ConfigurationBuilder {
    config: Configuration,
}

impl ConfigurationBuilder {
    /// Set one adapter option
    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.options.insert(name.into(), value.into());
        self
    }

    /// Replace all adapter options
    pub fn options(mut self, options: Options) -> Self {
        self.config.options = options;
        self
    }

    /// Append a filter; filters run in the order they are added
    pub fn filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.config.filters.push(filter);
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.config.scope = Some(scope.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<PrioritySet>) -> Self {
        self.config.priority = priority.into();
        self
    }

    /// Set one extra setting
    pub fn extra(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.extra.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Configuration {
        self.config
    }
}

/// Resolves configuration names to shared adapter instances
///
/// Generic over the adapter trait object (`dyn CacheAdapter`,
/// `dyn LogAdapter`). Each name is resolved at most once; every later
/// resolution returns the same `Arc` until the name is registered again
/// or the registry is reset.
pub struct AdaptableRegistry<A: ?Sized> {
    factories: RwLock<HashMap<String, Factory<A>>>,
    configs: RwLock<HashMap<String, Arc<Configuration>>>,
    instances: RwLock<HashMap<String, Arc<A>>>,
    // per-name build locks; factories run outside the maps' locks
    building: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<A: ?Sized> Default for AdaptableRegistry<A> {
    fn default() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            configs: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
            building: Mutex::new(HashMap::new()),
        }
    }
}

impl<A: ?Sized + Send + Sync + 'static> AdaptableRegistry<A> {
    /// Create an empty registry without factories
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter constructor under a type identifier
    pub fn factory<F>(&self, type_id: impl Into<String>, factory: F)
    where
        F: Fn(&Options) -> Result<Arc<A>> + Send + Sync + 'static,
    {
        self.factories.write().insert(type_id.into(), Arc::new(factory));
    }

    /// Register a configuration, replacing any previous one of that name
    ///
    /// An adapter already built for the name is forgotten.
    pub fn register(&self, name: impl Into<String>, config: Configuration) {
        let name = name.into();
        // lock order: configs, then instances
        let mut configs = self.configs.write();
        let mut instances = self.instances.write();
        instances.remove(&name);
        configs.insert(name, Arc::new(config));
    }

    /// Look up a configuration; `None` when the name is unregistered
    pub fn config(&self, name: &str) -> Option<Arc<Configuration>> {
        self.configs.read().get(name).cloned()
    }

    /// Registered configuration names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether an adapter has already been built for `name`
    pub fn is_resolved(&self, name: &str) -> bool {
        self.instances.read().contains_key(name)
    }

    /// The adapter for `name`, built on first access
    ///
    /// Concurrent first resolutions of one name build a single instance.
    /// Factories may resolve other names of the same registry.
    pub fn adapter(&self, name: &str) -> Result<Arc<A>> {
        if let Some(adapter) = self.instances.read().get(name) {
            return Ok(adapter.clone());
        }

        let build_lock = self
            .building
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        let _building = build_lock.lock();

        // Another caller may have built it while we waited for the lock
        if let Some(adapter) = self.instances.read().get(name) {
            return Ok(adapter.clone());
        }

        let config = self
            .config(name)
            .ok_or_else(|| CacheError::NotConfigured(name.to_string()))?;
        let factory = self
            .factories
            .read()
            .get(&config.adapter)
            .cloned()
            .ok_or_else(|| CacheError::UnknownAdapter(config.adapter.clone()))?;

        let adapter = factory(&config.options)?;
        tracing::debug!(target: "strata_cache", config = %name, adapter = %config.adapter, "adapter built");

        let configs = self.configs.read();
        let mut instances = self.instances.write();
        // A registration that landed during the build wins; the instance
        // built from the replaced configuration is not memoized
        if configs.get(name).is_some_and(|current| Arc::ptr_eq(current, &config)) {
            instances.insert(name.to_string(), adapter.clone());
        }
        Ok(adapter)
    }

    /// Forget every configuration and built adapter; factories stay
    pub fn reset(&self) {
        let mut configs = self.configs.write();
        let mut instances = self.instances.write();
        instances.clear();
        configs.clear();
    }
}
