//! Stored cache entry

use serde_json::Value;
use std::time::{Duration, SystemTime};

use super::expiry::Ttl;

/// A stored value with the metadata needed to expire it
#[derive(Debug, Clone)]
pub struct CacheEntry<T = Value> {
    /// The cached value
    pub value: T,
    /// When the entry was written
    pub created_at: SystemTime,
    /// Time-to-live, `None` for persistent entries
    pub ttl: Option<Duration>,
}

impl<T> CacheEntry<T> {
    /// Create a persistent entry
    pub fn new(value: T) -> Self {
        Self {
            value,
            created_at: SystemTime::now(),
            ttl: None,
        }
    }

    /// Create entry with TTL
    pub fn with_ttl(value: T, ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new(value)
        }
    }

    /// Create entry from a normalized TTL
    pub fn from_ttl(value: T, ttl: Ttl) -> Self {
        Self {
            ttl: ttl.duration(),
            ..Self::new(value)
        }
    }

    /// Check if entry has expired
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self
                .created_at
                .elapsed()
                .map(|elapsed| elapsed >= ttl)
                .unwrap_or(false),
            None => false,
        }
    }

    /// Get remaining TTL
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.ttl.and_then(|ttl| {
            self.created_at
                .elapsed()
                .ok()
                .and_then(|elapsed| ttl.checked_sub(elapsed))
        })
    }

    /// Get age of the entry
    pub fn age(&self) -> Duration {
        self.created_at.elapsed().unwrap_or_default()
    }
}
