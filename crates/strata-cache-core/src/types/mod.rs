//! Core types for cache operations

mod entry;
mod expiry;
mod params;
mod priority;
mod stats;

pub use entry::CacheEntry;
pub use expiry::{parse_time, Expiry, Ttl, DEFAULT_EXPIRY, PERSIST};
pub use params::{outcome, param, Context, Entries, Method, Params};
pub use priority::{Priority, PrioritySet};
pub use stats::CacheStats;
