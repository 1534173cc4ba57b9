use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;

use strata_cache_core::{CacheError, LogAdapter, Priority, Result};

/// A message kept by [`MemoryLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub priority: Priority,
    pub message: String,
    pub logged_at: SystemTime,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MemoryLogConfig {
    /// Records kept before the oldest is dropped (0 = unlimited)
    capacity: usize,
}

impl Default for MemoryLogConfig {
    fn default() -> Self {
        Self { capacity: 1_000 }
    }
}

/// Log adapter keeping the most recent messages in memory
///
/// Cloning creates a new handle to the SAME buffer.
#[derive(Debug, Clone)]
pub struct MemoryLog {
    records: Arc<Mutex<VecDeque<LogRecord>>>,
    capacity: usize,
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new(MemoryLogConfig::default().capacity)
    }
}

impl MemoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::new())),
            capacity,
        }
    }

    /// Build from a configuration's options map
    pub fn from_options(options: &Map<String, Value>) -> Result<Self> {
        let config: MemoryLogConfig = serde_json::from_value(Value::Object(options.clone()))
            .map_err(|e| CacheError::Configuration {
                name: "Memory".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::new(config.capacity))
    }

    /// Snapshot of the kept records, oldest first
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Kept messages, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

#[async_trait]
impl LogAdapter for MemoryLog {
    async fn write(&self, priority: Priority, message: &str) -> bool {
        let mut records = self.records.lock();
        if self.capacity > 0 && records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(LogRecord {
            priority,
            message: message.to_string(),
            logged_at: SystemTime::now(),
        });
        true
    }
}
