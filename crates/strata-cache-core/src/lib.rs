//! strata-cache-core: Core traits and types for the strata-cache library
//!
//! This crate provides the adapter contracts, the named-parameter call
//! description and the filter chain shared by the cache and logger
//! facades.

mod error;
pub mod filter;
mod traits;
mod types;

pub use error::{CacheError, Result};
pub use filter::{filter_fn, BoxFuture, Filter, FilterChain, FilterFn, Next, Terminal};
pub use traits::*;
pub use types::*;
