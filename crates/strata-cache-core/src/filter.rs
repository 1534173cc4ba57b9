//! Deferred execution through an ordered chain of filters
//!
//! A call is described by a [`Context`] and named [`Params`]. The real work
//! is a [`Terminal`] (usually a prepared adapter operation). Filters wrap the
//! terminal in declaration order, outermost first; each one receives a
//! [`Next`] handle and decides whether, how often and with which params the
//! rest of the chain runs.
//!
//! ```ignore
//! let result = FilterChain::run(&ctx, params, &operation, &config.filters).await;
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Context, Params};

/// Boxed future returned by closure filters
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Bottom of a chain: the operation that actually talks to a backend
#[async_trait]
pub trait Terminal: Send + Sync {
    async fn execute(&self, params: Params) -> Value;
}

/// An interceptor wrapping every call made through a configuration
///
/// Return `next.run(params).await` to delegate, possibly after rewriting
/// `params` or before post-processing the result. Returning without calling
/// `next` suppresses the terminal operation; the returned value should then
/// have the method's result shape (see [`crate::Method::negative`]).
#[async_trait]
pub trait Filter: Send + Sync + 'static {
    async fn apply(&self, ctx: &Context, params: Params, next: Next<'_>) -> Value;
}

/// Handle to the remainder of a chain
///
/// `Next` is `Copy`, so a filter may run the remainder more than once
/// (retries, fan-out) and merge the results itself.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    ctx: &'a Context,
    filters: &'a [Arc<dyn Filter>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    /// Run the rest of the chain with `params`
    pub async fn run(self, params: Params) -> Value {
        match self.filters.split_first() {
            Some((filter, rest)) => {
                let next = Next {
                    ctx: self.ctx,
                    filters: rest,
                    terminal: self.terminal,
                };
                filter.apply(self.ctx, params, next).await
            }
            None => self.terminal.execute(params).await,
        }
    }

    /// Context of the call being run
    pub fn context(&self) -> &'a Context {
        self.ctx
    }

    /// Number of filters left before the terminal
    pub fn remaining(&self) -> usize {
        self.filters.len()
    }
}

/// Entry point for running a call through filters
pub struct FilterChain;

impl FilterChain {
    /// Run `terminal` wrapped by `filters`, outermost first
    pub async fn run(
        ctx: &Context,
        params: Params,
        terminal: &dyn Terminal,
        filters: &[Arc<dyn Filter>],
    ) -> Value {
        Next {
            ctx,
            filters,
            terminal,
        }
        .run(params)
        .await
    }
}

/// Filter built from a closure
///
/// ```ignore
/// let upper = filter_fn(|_ctx, mut params, next| {
///     Box::pin(async move {
///         params.set("message", "HELLO");
///         next.run(params).await
///     })
/// });
/// ```
pub struct FilterFn<F> {
    f: F,
}

impl<F> FilterFn<F>
where
    F: for<'a> Fn(&'a Context, Params, Next<'a>) -> BoxFuture<'a, Value> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

/// Wrap a closure straight into the shared form configurations hold
pub fn filter_fn<F>(f: F) -> Arc<dyn Filter>
where
    F: for<'a> Fn(&'a Context, Params, Next<'a>) -> BoxFuture<'a, Value> + Send + Sync + 'static,
{
    Arc::new(FilterFn::new(f))
}

#[async_trait]
impl<F> Filter for FilterFn<F>
where
    F: for<'a> Fn(&'a Context, Params, Next<'a>) -> BoxFuture<'a, Value> + Send + Sync + 'static,
{
    async fn apply(&self, ctx: &Context, params: Params, next: Next<'_>) -> Value {
        (self.f)(ctx, params, next).await
    }
}
