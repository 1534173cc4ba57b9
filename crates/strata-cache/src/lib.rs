//! strata-cache: Adapter-based caching and logging with filter chains
//!
//! # Features
//!
//! - **Named configurations** resolved to shared adapter instances
//! - **Filter chains** wrapping every adapter call
//! - **Memory and Redis adapters** behind one contract
//! - **Logger facade** fanning out to every matching sink
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata_cache::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(CacheRegistry::with_builtin());
//!     registry.register(
//!         "default",
//!         Configuration::builder("Memory").option("prefix", "app:").build(),
//!     );
//!     let cache = Cache::new(registry);
//!
//!     cache.write_one("default", "answer", 42, Some(Expiry::Seconds(60))).await;
//!     assert_eq!(cache.read_one("default", "answer").await, Some(json!(42)));
//! }
//! ```

mod cache;
pub mod filters;
mod log;
mod registry;

// Re-export core
pub use strata_cache_core::*;

// Re-export storage
#[cfg(feature = "memory")]
pub use strata_cache_storage::{MemoryAdapter, MemoryConfig, MemoryStore, RuntimeMode};

#[cfg(feature = "redis")]
pub use strata_cache_storage::{RedisAdapter, RedisConfig};

pub use cache::{Cache, CacheRegistry};
pub use log::{LogOptions, LogRecord, LogRegistry, Logger, MemoryLog, TracingLog};
pub use registry::{AdaptableRegistry, Configuration, ConfigurationBuilder, Factory, Options};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::filters::{CircuitBreaker, Coalesce, MetricsFilter};
    pub use crate::{
        filter_fn, AdaptableRegistry, Cache, CacheAdapter, CacheError, CacheRegistry,
        Configuration, Context, Entries, Expiry, Filter, LogAdapter, LogOptions, LogRegistry,
        Logger, Method, Next, Params, Priority, PrioritySet, Result,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryAdapter, MemoryConfig};

    #[cfg(feature = "redis")]
    pub use crate::{RedisAdapter, RedisConfig};
}
