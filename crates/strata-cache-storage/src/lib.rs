//! strata-cache-storage: Cache adapters for strata-cache
//!
//! - [`MemoryAdapter`] keeps entries in process (feature `memory`, on by default)
//! - [`RedisAdapter`] talks to a Redis server through a bb8 pool (feature `redis`)

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "memory")]
pub use memory::{MemoryAdapter, MemoryConfig, MemoryStore, RuntimeMode};

#[cfg(feature = "redis")]
pub use redis::{RedisAdapter, RedisConfig};
