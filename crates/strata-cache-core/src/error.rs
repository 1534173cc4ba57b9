//! Error types for cache and logger operations

use thiserror::Error;

/// Main error type for the strata-cache crates
///
/// Facade calls never surface these to the caller: backend failures turn
/// into negative results. The variants show up where something has to be
/// reported, mostly registry resolution and adapter internals.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Backend connection failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend operation failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Expiry expression could not be parsed
    #[error("invalid expiry expression: {0}")]
    InvalidExpiry(String),

    /// Adapter options could not be turned into an adapter config
    #[error("invalid configuration for `{name}`: {reason}")]
    Configuration { name: String, reason: String },

    /// No factory is registered for the adapter type identifier
    #[error("unknown adapter type `{0}`")]
    UnknownAdapter(String),

    /// No configuration is registered under the name
    #[error("no configuration named `{0}`")]
    NotConfigured(String),

    /// Circuit breaker rejected the call
    #[error("circuit open for `{0}`")]
    CircuitOpen(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Whether the error comes from the backend rather than from setup
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            CacheError::Connection(_) | CacheError::Backend(_) | CacheError::Internal(_)
        )
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::UnknownAdapter("Apc".to_string());
        assert_eq!(err.to_string(), "unknown adapter type `Apc`");

        let err = CacheError::Configuration {
            name: "default".to_string(),
            reason: "missing url".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration for `default`: missing url"
        );

        let err = CacheError::InvalidExpiry("+1 fortnight".to_string());
        assert_eq!(err.to_string(), "invalid expiry expression: +1 fortnight");
    }

    #[test]
    fn test_backend_classification() {
        assert!(CacheError::Connection("refused".into()).is_backend());
        assert!(CacheError::Backend("oom".into()).is_backend());
        assert!(!CacheError::NotConfigured("x".into()).is_backend());
        assert!(!CacheError::UnknownAdapter("x".into()).is_backend());
    }
}
