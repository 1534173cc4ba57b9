use serde_json::Value;
use std::future::Future;

use strata_cache_core::{Expiry, Result};

use super::Cache;

impl Cache {
    /// Read `key`, or load, store and return it on a miss
    ///
    /// A loader error is returned as is and nothing is stored. A failed
    /// write does not fail the call; the loaded value is still returned.
    ///
    /// ```ignore
    /// let user = cache
    ///     .remember("users", "42", Some(Expiry::Seconds(300)), || async {
    ///         Ok(json!({"id": 42, "name": "ada"}))
    ///     })
    ///     .await?;
    /// ```
    pub async fn remember<F, Fut>(
        &self,
        name: &str,
        key: &str,
        expiry: Option<Expiry>,
        loader: F,
    ) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Some(value) = self.read_one(name, key).await {
            return Ok(value);
        }

        let value = loader().await?;
        if !self.write_one(name, key, value.clone(), expiry).await {
            tracing::debug!(target: "strata_cache", config = %name, key = %key, "loaded value not stored");
        }
        Ok(value)
    }
}
