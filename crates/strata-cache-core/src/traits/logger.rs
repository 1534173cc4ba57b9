//! Log adapter trait

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::filter::Terminal;
use crate::{param, Method, Params, Priority};

/// Contract every log sink implements
#[async_trait]
pub trait LogAdapter: Send + Sync + 'static {
    /// Write one message; `false` when the sink could not take it
    async fn write(&self, priority: Priority, message: &str) -> bool;
}

/// A log write prepared for execution at the bottom of a chain
#[derive(Clone)]
pub struct LogOperation {
    adapter: Arc<dyn LogAdapter>,
}

impl LogOperation {
    pub fn prepare(adapter: Arc<dyn LogAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Terminal for LogOperation {
    async fn execute(&self, params: Params) -> Value {
        let priority = params
            .str(param::PRIORITY)
            .and_then(|p| p.parse::<Priority>().ok());
        match (priority, params.str(param::MESSAGE)) {
            (Some(priority), Some(message)) => {
                Value::Bool(self.adapter.write(priority, message).await)
            }
            _ => Method::Log.negative(),
        }
    }
}
