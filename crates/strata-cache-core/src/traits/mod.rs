//! Core traits for cache and log adapters

mod adapter;
mod logger;
mod metrics;

#[cfg(feature = "tracing")]
mod tracing;

pub use adapter::{CacheAdapter, Operation};
pub use logger::{LogAdapter, LogOperation};
pub use metrics::{CacheMetrics, NoopMetrics};

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;

#[cfg(feature = "tracing")]
pub use self::tracing::TracingMetrics;
