//! Named call parameters and call context passed through a filter chain

use serde_json::{Map, Value};

use super::expiry::Expiry;

/// Ordered key -> value mapping used for batch writes and read results
pub type Entries = Map<String, Value>;

/// Well-known parameter names
pub mod param {
    /// Keys of a batch read or delete (array of strings)
    pub const KEYS: &str = "keys";
    /// Key -> value pairs of a batch write (object)
    pub const ENTRIES: &str = "entries";
    /// Expiry of a write, absent for the configured default
    pub const EXPIRY: &str = "expiry";
    /// Key of a counter operation
    pub const KEY: &str = "key";
    /// Offset of a counter operation
    pub const OFFSET: &str = "offset";
    /// Priority of a log write
    pub const PRIORITY: &str = "priority";
    /// Message of a log write
    pub const MESSAGE: &str = "message";
}

/// Operation being run through a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Read,
    Write,
    Delete,
    Increment,
    Decrement,
    Clear,
    Log,
}

impl Method {
    /// Get method as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Read => "read",
            Method::Write => "write",
            Method::Delete => "delete",
            Method::Increment => "increment",
            Method::Decrement => "decrement",
            Method::Clear => "clear",
            Method::Log => "log",
        }
    }

    /// Result a filter returns when it suppresses this method
    ///
    /// Matches the shape the facade decodes: an empty object for reads,
    /// `false` for everything else.
    pub fn negative(&self) -> Value {
        match self {
            Method::Read => Value::Object(Map::new()),
            _ => Value::Bool(false),
        }
    }
}

/// Identity of a single call travelling through a filter chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Name of the configuration the call was resolved against
    pub config: String,
    /// Operation being performed
    pub method: Method,
}

impl Context {
    pub fn new(config: impl Into<String>, method: Method) -> Self {
        Self {
            config: config.into(),
            method,
        }
    }
}

/// Named arguments of a call
///
/// Filters read and rewrite arguments by name (see [`param`]) instead of
/// by position, so they work across every method of a configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a parameter, returning the previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.0.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    /// String items of an array parameter; non-string items are skipped
    pub fn strings(&self, name: &str) -> Vec<String> {
        self.0
            .get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Object parameter, empty when absent or not an object
    pub fn entries(&self, name: &str) -> Entries {
        self.0
            .get(name)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// The `expiry` parameter, `None` when absent
    pub fn expiry(&self) -> Option<Expiry> {
        self.0.get(param::EXPIRY).and_then(Expiry::from_value)
    }

    /// Parameter names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params(map)
    }
}

/// Decoding of chain results back into the facade's typed shapes
///
/// Anything that does not have the expected shape decodes as the
/// negative result.
pub mod outcome {
    use super::Entries;
    use serde_json::Value;

    pub fn into_bool(value: Value) -> bool {
        matches!(value, Value::Bool(true))
    }

    pub fn into_entries(value: Value) -> Entries {
        match value {
            Value::Object(map) => map,
            _ => Entries::new(),
        }
    }

    pub fn into_counter(value: Value) -> Option<i64> {
        value.as_i64()
    }

    pub fn from_counter(counter: Option<i64>) -> Value {
        counter.map(Value::from).unwrap_or(Value::Bool(false))
    }
}
