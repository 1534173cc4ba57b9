//! Cache adapter trait and the prepared operation that drives it

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::filter::Terminal;
use crate::{outcome, param, CacheStats, Entries, Expiry, Method, Params};

/// Contract every cache backend implements
///
/// Adapters know nothing about filters or configuration names. They never
/// fail loudly: a missing key is simply absent from a read, a partial
/// batch failure turns into `false`, a non-numeric counter into `None`,
/// and an unreachable backend into the negative result of each method.
#[async_trait]
pub trait CacheAdapter: Send + Sync + 'static {
    /// Store every pair with the same TTL
    ///
    /// `None` uses the adapter's configured default expiry. Returns `true`
    /// only if no key failed to store.
    async fn write(&self, entries: Entries, expiry: Option<Expiry>) -> bool;

    /// Fetch the subset of `keys` currently present, in request order
    async fn read(&self, keys: &[String]) -> Entries;

    /// Remove every key; `true` only if none failed
    async fn delete(&self, keys: &[String]) -> bool;

    /// Atomically add `offset` to an integer value and return the result
    ///
    /// Returns `None` and leaves the value untouched when the key is
    /// absent or does not hold an integer.
    async fn increment(&self, key: &str, offset: i64) -> Option<i64>;

    /// Atomically subtract `offset`; same rules as [`CacheAdapter::increment`]
    async fn decrement(&self, key: &str, offset: i64) -> Option<i64>;

    /// Drop every entry in this adapter's namespace
    async fn clear(&self) -> bool;

    /// Whether the backend is usable in the current runtime context
    async fn enabled(&self) -> bool;

    /// Activity counters, for adapters that keep them
    async fn stats(&self) -> Option<CacheStats> {
        None
    }
}

/// An adapter method prepared for execution at the bottom of a chain
///
/// The call's arguments travel separately as [`Params`] so filters can
/// rewrite them; `execute` reads them back by name.
#[derive(Clone)]
pub struct Operation {
    adapter: Arc<dyn CacheAdapter>,
    method: Method,
}

impl Operation {
    pub fn prepare(adapter: Arc<dyn CacheAdapter>, method: Method) -> Self {
        Self { adapter, method }
    }

    pub fn method(&self) -> Method {
        self.method
    }
}

#[async_trait]
impl Terminal for Operation {
    async fn execute(&self, params: Params) -> Value {
        let adapter = &self.adapter;
        match self.method {
            Method::Read => Value::Object(adapter.read(&params.strings(param::KEYS)).await),
            Method::Write => {
                let entries = params.entries(param::ENTRIES);
                Value::Bool(adapter.write(entries, params.expiry()).await)
            }
            Method::Delete => Value::Bool(adapter.delete(&params.strings(param::KEYS)).await),
            Method::Increment | Method::Decrement => {
                let Some(key) = params.str(param::KEY) else {
                    return self.method.negative();
                };
                let offset = params.i64(param::OFFSET).unwrap_or(1);
                let counter = if self.method == Method::Increment {
                    adapter.increment(key, offset).await
                } else {
                    adapter.decrement(key, offset).await
                };
                outcome::from_counter(counter)
            }
            Method::Clear => Value::Bool(adapter.clear().await),
            Method::Log => self.method.negative(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Remembers the arguments of the last call
    #[derive(Default)]
    struct Spy {
        last: Mutex<Option<String>>,
    }

    impl Spy {
        fn record(&self, call: String) {
            *self.last.lock().unwrap() = Some(call);
        }
    }

    #[async_trait]
    impl CacheAdapter for Spy {
        async fn write(&self, entries: Entries, expiry: Option<Expiry>) -> bool {
            self.record(format!("write {:?} {:?}", entries.keys().collect::<Vec<_>>(), expiry));
            true
        }

        async fn read(&self, keys: &[String]) -> Entries {
            self.record(format!("read {keys:?}"));
            keys.iter().map(|k| (k.clone(), json!(k.len()))).collect()
        }

        async fn delete(&self, keys: &[String]) -> bool {
            self.record(format!("delete {keys:?}"));
            true
        }

        async fn increment(&self, key: &str, offset: i64) -> Option<i64> {
            self.record(format!("increment {key} {offset}"));
            Some(offset)
        }

        async fn decrement(&self, key: &str, offset: i64) -> Option<i64> {
            self.record(format!("decrement {key} {offset}"));
            None
        }

        async fn clear(&self) -> bool {
            self.record("clear".to_string());
            true
        }

        async fn enabled(&self) -> bool {
            true
        }
    }

    fn prepare(spy: &Arc<Spy>, method: Method) -> Operation {
        Operation::prepare(spy.clone(), method)
    }

    #[tokio::test]
    async fn test_execute_decodes_named_params() {
        let spy = Arc::new(Spy::default());

        let params = Params::new()
            .with(param::ENTRIES, json!({"a": 1}))
            .with(param::EXPIRY, Expiry::Seconds(0).to_value());
        assert_eq!(prepare(&spy, Method::Write).execute(params).await, json!(true));
        assert_eq!(
            spy.last.lock().unwrap().as_deref(),
            Some(r#"write ["a"] Some(Seconds(0))"#)
        );

        let params = Params::new().with(param::KEYS, json!(["ab", "c"]));
        assert_eq!(
            prepare(&spy, Method::Read).execute(params).await,
            json!({"ab": 2, "c": 1})
        );
    }

    #[tokio::test]
    async fn test_counter_defaults_and_sentinel() {
        let spy = Arc::new(Spy::default());

        let params = Params::new().with(param::KEY, "n");
        assert_eq!(prepare(&spy, Method::Increment).execute(params).await, json!(1));
        assert_eq!(spy.last.lock().unwrap().as_deref(), Some("increment n 1"));

        let params = Params::new().with(param::KEY, "n").with(param::OFFSET, 3);
        assert_eq!(prepare(&spy, Method::Decrement).execute(params).await, json!(false));

        // a counter call without a key never reaches the adapter
        *spy.last.lock().unwrap() = None;
        assert_eq!(
            prepare(&spy, Method::Increment).execute(Params::new()).await,
            json!(false)
        );
        assert!(spy.last.lock().unwrap().is_none());
    }
}
