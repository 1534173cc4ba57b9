use async_trait::async_trait;

use strata_cache_core::{LogAdapter, Priority};

/// Log adapter forwarding messages to `tracing` events
///
/// Emergency through error map to `ERROR`, warning to `WARN`, notice and
/// info to `INFO`, debug to `DEBUG`. The original priority is kept as a
/// field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

#[async_trait]
impl LogAdapter for TracingLog {
    async fn write(&self, priority: Priority, message: &str) -> bool {
        let priority_name = priority.as_str();
        match priority {
            Priority::Emergency | Priority::Alert | Priority::Critical | Priority::Error => {
                tracing::error!(target: "strata_cache", priority = priority_name, "{message}")
            }
            Priority::Warning => {
                tracing::warn!(target: "strata_cache", priority = priority_name, "{message}")
            }
            Priority::Notice | Priority::Info => {
                tracing::info!(target: "strata_cache", priority = priority_name, "{message}")
            }
            Priority::Debug => {
                tracing::debug!(target: "strata_cache", priority = priority_name, "{message}")
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_accepts() {
        for priority in Priority::ALL {
            assert!(TracingLog.write(priority, "hello").await);
        }
    }
}
