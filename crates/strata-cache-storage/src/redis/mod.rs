//! Redis adapter implementation

mod adapter;
mod config;

pub use adapter::RedisAdapter;
pub use config::RedisConfig;
