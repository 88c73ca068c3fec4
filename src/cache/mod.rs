//! Generic caching layer for catalog queries.
//!
//! This module provides a domain-agnostic caching mechanism that:
//! - Caches query results and individual entities in memory
//! - Serves entries within a per-key freshness window without refetching
//! - Collapses concurrent fetches of the same key into one network call
//! - Supports explicit invalidation after mutations

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, MemoryStorage, NoopStorage};
pub use traits::{CacheResult, CacheSource, Cacheable, QueryKey};
