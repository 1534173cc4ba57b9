//! TTL-based expiration index for efficient expiration

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Time-wheel based TTL index for O(1) expiration lookups
///
/// Instead of scanning all entries to find expired ones,
/// this maintains buckets of keys organized by expiration time.
/// TTLs longer than the wheel wrap around; callers re-check the entry
/// and reschedule what has not expired yet.
pub struct TtlIndex {
    /// Tick duration (bucket resolution)
    tick_duration: Duration,
    /// Buckets of keys by expiration slot
    buckets: Vec<HashSet<String>>,
    /// Current bucket index
    current: usize,
    /// Map of key -> bucket index for O(1) removal
    key_to_bucket: HashMap<String, usize>,
    /// Last tick time
    last_tick: Instant,
}

impl TtlIndex {
    /// Create a new TTL index
    ///
    /// # Arguments
    /// * `tick_duration` - Resolution of each time bucket (e.g., 1 second)
    /// * `horizon` - Longest TTL the wheel covers without wrapping
    pub fn new(tick_duration: Duration, horizon: Duration) -> Self {
        let tick_secs = tick_duration.as_secs().max(1);
        let num_buckets = ((horizon.as_secs() / tick_secs) as usize + 1).max(60);

        Self {
            tick_duration,
            buckets: vec![HashSet::new(); num_buckets],
            current: 0,
            key_to_bucket: HashMap::new(),
            last_tick: Instant::now(),
        }
    }

    /// Schedule a key for expiration after `ttl`
    pub fn schedule(&mut self, key: String, ttl: Duration) {
        self.remove(&key);

        let tick_secs = self.tick_duration.as_secs().max(1);
        let ticks = (ttl.as_secs() / tick_secs) as usize;
        let bucket_idx = (self.current + ticks.min(self.buckets.len() - 1) + 1) % self.buckets.len();

        self.buckets[bucket_idx].insert(key.clone());
        self.key_to_bucket.insert(key, bucket_idx);
    }

    /// Remove a key from the index
    pub fn remove(&mut self, key: &str) {
        if let Some(bucket_idx) = self.key_to_bucket.remove(key) {
            self.buckets[bucket_idx].remove(key);
        }
    }

    /// Check if a key is scheduled
    pub fn contains(&self, key: &str) -> bool {
        self.key_to_bucket.contains_key(key)
    }

    /// Advance the wheel and return keys whose slot has passed
    pub fn tick(&mut self) -> Vec<String> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        let tick_secs = self.tick_duration.as_secs().max(1);
        let ticks_to_advance = (elapsed.as_secs() / tick_secs) as usize;

        if ticks_to_advance == 0 {
            return Vec::new();
        }

        let mut due = Vec::new();
        for _ in 0..ticks_to_advance.min(self.buckets.len()) {
            self.current = (self.current + 1) % self.buckets.len();
            let bucket: Vec<String> = self.buckets[self.current].drain().collect();

            for key in &bucket {
                self.key_to_bucket.remove(key);
            }

            due.extend(bucket);
        }

        self.last_tick = now;
        due
    }

    /// Get the number of scheduled keys
    pub fn len(&self) -> usize {
        self.key_to_bucket.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.key_to_bucket.is_empty()
    }

    /// Keep only the scheduled keys for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let dropped: Vec<String> = self
            .key_to_bucket
            .keys()
            .filter(|key| !keep(key))
            .cloned()
            .collect();
        for key in dropped {
            self.remove(&key);
        }
    }

    /// Clear all scheduled keys
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.key_to_bucket.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_and_remove() {
        let mut index = TtlIndex::new(Duration::from_secs(1), Duration::from_secs(60));

        index.schedule("key1".to_string(), Duration::from_secs(10));
        assert!(index.contains("key1"));
        assert_eq!(index.len(), 1);

        index.remove("key1");
        assert!(!index.contains("key1"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_reschedule() {
        let mut index = TtlIndex::new(Duration::from_secs(1), Duration::from_secs(60));

        index.schedule("key1".to_string(), Duration::from_secs(10));
        index.schedule("key1".to_string(), Duration::from_secs(20));

        // Should only be in one bucket
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_ttl_beyond_horizon_is_clamped() {
        let mut index = TtlIndex::new(Duration::from_secs(1), Duration::from_secs(60));

        index.schedule("far".to_string(), Duration::from_secs(86_400));
        assert!(index.contains("far"));
        // nothing is due before a full second has passed
        assert!(index.tick().is_empty());
    }

    #[test]
    fn test_retain_by_prefix() {
        let mut index = TtlIndex::new(Duration::from_secs(1), Duration::from_secs(60));

        index.schedule("a:1".to_string(), Duration::from_secs(10));
        index.schedule("b:1".to_string(), Duration::from_secs(10));
        index.retain(|key| !key.starts_with("a:"));

        assert!(!index.contains("a:1"));
        assert!(index.contains("b:1"));

        index.clear();
        assert!(index.is_empty());
    }
}
