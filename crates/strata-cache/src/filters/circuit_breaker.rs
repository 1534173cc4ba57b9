use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use strata_cache_core::{CacheError, Context, Filter, Method, Next, Params};

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Closed,
    Open(Instant), // Instant when it opened
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: State,
    failures: u32,
}

/// Filter that stops calling a failing backend for a while
///
/// After `failure_threshold` consecutive failed writes, deletes, clears or
/// log writes, calls short-circuit with their negative result until
/// `reset_timeout` has passed. The next call is then let through as a
/// probe: success closes the circuit, failure opens it again. Reads and
/// counters pass through unaffected while closed and are never counted,
/// since a miss is not a failure.
///
/// Clones share state, so one breaker can guard several configurations
/// that talk to the same backend.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    inner: Arc<RwLock<Inner>>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: State::Closed,
                failures: 0,
            })),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
        }
    }

    /// Check if we can execute a request
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.write();
        match inner.state {
            State::Closed | State::HalfOpen => true,
            State::Open(opened_at) => {
                if opened_at.elapsed() >= self.reset_timeout {
                    inner.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Report success
    pub fn report_success(&self) {
        let mut inner = self.inner.write();
        if matches!(inner.state, State::HalfOpen | State::Closed) {
            inner.state = State::Closed;
            inner.failures = 0;
        }
    }

    /// Report failure
    pub fn report_failure(&self) {
        let mut inner = self.inner.write();
        match inner.state {
            State::Closed => {
                inner.failures += 1;
                if inner.failures >= self.failure_threshold {
                    inner.state = State::Open(Instant::now());
                }
            }
            State::HalfOpen => {
                inner.state = State::Open(Instant::now());
            }
            State::Open(_) => {}
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.inner.read().state, State::Open(_))
    }

    /// Methods whose `false` result counts as a backend failure
    fn is_tracked(method: Method) -> bool {
        matches!(
            method,
            Method::Write | Method::Delete | Method::Clear | Method::Log
        )
    }
}

#[async_trait]
impl Filter for CircuitBreaker {
    async fn apply(&self, ctx: &Context, params: Params, next: Next<'_>) -> Value {
        if !self.allow_request() {
            let rejected = CacheError::CircuitOpen(ctx.config.clone());
            tracing::warn!(target: "strata_cache", method = ctx.method.as_str(), error = %rejected, "call rejected");
            return ctx.method.negative();
        }

        let result = next.run(params).await;
        if Self::is_tracked(ctx.method) {
            if result == Value::Bool(true) {
                self.report_success();
            } else {
                self.report_failure();
            }
        }
        result
    }
}
