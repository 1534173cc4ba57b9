//! Logger facade and built-in log adapters

use std::sync::Arc;

use strata_cache_core::{
    outcome, param, Context, FilterChain, LogAdapter, LogOperation, Method, Params, Priority,
};

use crate::registry::AdaptableRegistry;

mod memory;
mod tracing_log;

pub use memory::{LogRecord, MemoryLog};
pub use tracing_log::TracingLog;

/// Registry of log adapters
pub type LogRegistry = AdaptableRegistry<dyn LogAdapter>;

impl AdaptableRegistry<dyn LogAdapter> {
    /// Registry with factories for `"Tracing"` ([`TracingLog`]) and
    /// `"Memory"` ([`MemoryLog`])
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.factory("Tracing", |_options| Ok(Arc::new(TracingLog) as Arc<dyn LogAdapter>));
        registry.factory("Memory", |options| {
            Ok(Arc::new(MemoryLog::from_options(options)?) as Arc<dyn LogAdapter>)
        });
        registry
    }
}

/// Routing of a single log write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Write only to this configuration, whatever its priorities
    pub name: Option<String>,
    /// Write to configurations registered with this scope
    pub scope: Option<String>,
}

impl LogOptions {
    /// Target a single configuration
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            scope: None,
        }
    }

    /// Target configurations with a matching scope
    pub fn scoped(scope: impl Into<String>) -> Self {
        Self {
            name: None,
            scope: Some(scope.into()),
        }
    }
}

/// Entry point for log writes fanned out to named configurations
#[derive(Clone)]
pub struct Logger {
    registry: Arc<LogRegistry>,
}

impl Logger {
    pub fn new(registry: Arc<LogRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<LogRegistry> {
        &self.registry
    }

    /// Configurations a write is routed to
    ///
    /// Without a name, a configuration is targeted when it accepts the
    /// priority and its scope equals the requested one (both may be unset).
    fn targets(&self, priority: Priority, options: &LogOptions) -> Vec<String> {
        if let Some(name) = &options.name {
            return vec![name.clone()];
        }
        self.registry
            .names()
            .into_iter()
            .filter(|name| {
                self.registry.config(name).is_some_and(|config| {
                    config.priority.accepts(priority) && config.scope == options.scope
                })
            })
            .collect()
    }

    /// Write to every targeted configuration
    ///
    /// Returns `true` when at least one of them took the message. Every
    /// target is written to even after one succeeded.
    pub async fn write(&self, priority: Priority, message: &str, options: LogOptions) -> bool {
        let mut written = false;
        for name in self.targets(priority, &options) {
            written |= self.write_to(&name, priority, message).await;
        }
        written
    }

    async fn write_to(&self, name: &str, priority: Priority, message: &str) -> bool {
        let Some(config) = self.registry.config(name) else {
            return false;
        };
        let adapter = match self.registry.adapter(name) {
            Ok(adapter) => adapter,
            Err(e) => {
                tracing::error!(target: "strata_cache", config = %name, error = %e, "log adapter unavailable");
                return false;
            }
        };

        let ctx = Context::new(name, Method::Log);
        let params = Params::new()
            .with(param::PRIORITY, priority.as_str())
            .with(param::MESSAGE, message);
        let operation = LogOperation::prepare(adapter);
        outcome::into_bool(FilterChain::run(&ctx, params, &operation, &config.filters).await)
    }

    pub async fn emergency(&self, message: &str) -> bool {
        self.write(Priority::Emergency, message, LogOptions::default()).await
    }

    pub async fn alert(&self, message: &str) -> bool {
        self.write(Priority::Alert, message, LogOptions::default()).await
    }

    pub async fn critical(&self, message: &str) -> bool {
        self.write(Priority::Critical, message, LogOptions::default()).await
    }

    pub async fn error(&self, message: &str) -> bool {
        self.write(Priority::Error, message, LogOptions::default()).await
    }

    pub async fn warning(&self, message: &str) -> bool {
        self.write(Priority::Warning, message, LogOptions::default()).await
    }

    pub async fn notice(&self, message: &str) -> bool {
        self.write(Priority::Notice, message, LogOptions::default()).await
    }

    pub async fn info(&self, message: &str) -> bool {
        self.write(Priority::Info, message, LogOptions::default()).await
    }

    pub async fn debug(&self, message: &str) -> bool {
        self.write(Priority::Debug, message, LogOptions::default()).await
    }
}
