//! In-process cache adapter

mod adapter;
mod ttl_index;

pub use adapter::{MemoryAdapter, MemoryConfig, MemoryStore, RuntimeMode};
