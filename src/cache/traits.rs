//! Core traits and types for the caching system.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for entities that can be cached.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier for this entity (e.g., movie id, actor id)
  fn cache_key(&self) -> String;

  /// Entity type name for storage organization (e.g., "movie", "actor")
  fn entity_type() -> &'static str;
}

/// Trait for cache lookup keys.
///
/// A key identifies one cached query result. Two keys that hash to the same
/// value share a cache entry, so the hash must cover everything that affects
/// the result (query text, page number, page size).
pub trait QueryKey: Send + Sync {
  /// Stable hash used as the storage key.
  fn cache_hash(&self) -> String;

  /// Human-readable form for logging.
  fn description(&self) -> String;

  /// Freshness window override for entries stored under this key.
  /// Returns None to use the cache layer's default.
  fn stale_time(&self) -> Option<Duration> {
    None
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still within its freshness window
  Cache,
}
