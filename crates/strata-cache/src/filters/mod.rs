//! Built-in filters
//!
//! - [`MetricsFilter`] reports latency, hits, misses and failures
//! - [`CircuitBreaker`] stops calling a backend that keeps failing
//! - [`Coalesce`] shares one downstream read between concurrent callers

mod circuit_breaker;
mod coalesce;
mod metrics;

pub use circuit_breaker::CircuitBreaker;
pub use coalesce::Coalesce;
pub use metrics::MetricsFilter;
