use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

use strata_cache_core::{param, Context, Filter, Method, Next, Params};

/// Filter making concurrent identical reads share one downstream call
///
/// The first read of a key set becomes the leader and runs the rest of the
/// chain; reads of the same keys on the same configuration arriving while
/// it is in flight wait for its result. Other methods pass through.
#[derive(Clone, Default)]
pub struct Coalesce {
    // request key -> sender of the leader's result
    inflight: Arc<DashMap<String, broadcast::Sender<Value>>>,
}

impl Coalesce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reads currently in flight
    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    fn request_key(ctx: &Context, params: &Params) -> String {
        let keys = params.strings(param::KEYS).join("\u{1f}");
        format!("{}\u{1e}{}", ctx.config, keys)
    }
}

/// Removes the leader's entry when the leader finishes or is dropped
/// mid-flight, closing the channel for any waiting followers
struct LeaderGuard<'a> {
    inflight: &'a DashMap<String, broadcast::Sender<Value>>,
    key: String,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        self.inflight.remove(&self.key);
    }
}

#[async_trait]
impl Filter for Coalesce {
    async fn apply(&self, ctx: &Context, params: Params, next: Next<'_>) -> Value {
        if ctx.method != Method::Read {
            return next.run(params).await;
        }

        let key = Self::request_key(ctx, &params);

        // Join the in-flight request or become leader; the entry lock is
        // released at the end of this block
        let action = match self.inflight.entry(key.clone()) {
            Entry::Occupied(o) => Ok(o.get().subscribe()),
            Entry::Vacant(v) => {
                let (tx, _rx) = broadcast::channel(1);
                v.insert(tx.clone());
                Err(tx)
            }
        };

        match action {
            Ok(mut rx) => match rx.recv().await {
                Ok(result) => result,
                // leader went away without a result
                Err(_) => next.run(params).await,
            },
            Err(tx) => {
                let guard = LeaderGuard {
                    inflight: &self.inflight,
                    key,
                };
                let result = next.run(params).await;

                drop(guard);
                if tx.receiver_count() > 0 {
                    let _ = tx.send(result.clone());
                }

                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use strata_cache_core::{FilterChain, Terminal};

    #[derive(Default)]
    struct SlowRead {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Terminal for SlowRead {
        async fn execute(&self, _params: Params) -> Value {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            json!({"k": 1})
        }
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_call() {
        let coalesce: Arc<dyn Filter> = Arc::new(Coalesce::new());
        let filters = vec![coalesce];
        let terminal = SlowRead::default();
        let ctx = Context::new("default", Method::Read);
        let params = Params::new().with(param::KEYS, json!(["k"]));

        let (a, b, c) = tokio::join!(
            FilterChain::run(&ctx, params.clone(), &terminal, &filters),
            FilterChain::run(&ctx, params.clone(), &terminal, &filters),
            FilterChain::run(&ctx, params.clone(), &terminal, &filters),
        );

        assert_eq!(terminal.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, json!({"k": 1}));
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[tokio::test]
    async fn test_different_keys_are_not_shared() {
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(Coalesce::new())];
        let terminal = SlowRead::default();
        let ctx = Context::new("default", Method::Read);

        tokio::join!(
            FilterChain::run(&ctx, Params::new().with(param::KEYS, json!(["a"])), &terminal, &filters),
            FilterChain::run(&ctx, Params::new().with(param::KEYS, json!(["b"])), &terminal, &filters),
        );

        assert_eq!(terminal.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_followers() {
        let coalesce = Coalesce::new();
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(coalesce.clone())];
        let terminal = SlowRead::default();
        let ctx = Context::new("default", Method::Read);
        let params = Params::new().with(param::KEYS, json!(["k"]));

        let leader = tokio::time::timeout(
            Duration::from_millis(20),
            FilterChain::run(&ctx, params.clone(), &terminal, &filters),
        );
        let follower = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            tokio::time::timeout(
                Duration::from_secs(2),
                FilterChain::run(&ctx, params.clone(), &terminal, &filters),
            )
            .await
        };
        let (leader, follower) = tokio::join!(leader, follower);

        assert!(leader.is_err());
        assert_eq!(follower.unwrap(), json!({"k": 1}));
        assert_eq!(coalesce.inflight(), 0);

        // Later reads of the same keys are not stuck behind the dropped leader
        let later = tokio::time::timeout(
            Duration::from_secs(2),
            FilterChain::run(&ctx, params, &terminal, &filters),
        )
        .await;
        assert_eq!(later.unwrap(), json!({"k": 1}));
    }

    #[tokio::test]
    async fn test_other_methods_pass_through() {
        let coalesce = Coalesce::new();
        let filters: Vec<Arc<dyn Filter>> = vec![Arc::new(coalesce.clone())];
        let terminal = SlowRead::default();
        let ctx = Context::new("default", Method::Delete);
        let params = Params::new().with(param::KEYS, json!(["k"]));

        tokio::join!(
            FilterChain::run(&ctx, params.clone(), &terminal, &filters),
            FilterChain::run(&ctx, params.clone(), &terminal, &filters),
        );

        assert_eq!(terminal.calls.load(Ordering::SeqCst), 2);
        assert_eq!(coalesce.inflight(), 0);
    }
}
