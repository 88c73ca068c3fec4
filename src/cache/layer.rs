//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::storage::CacheStorage;
use super::traits::{CacheResult, Cacheable, QueryKey};

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the application and the network client. Reads are
/// cache-first: a result within its freshness window is returned without
/// touching the network, and concurrent requests for the same key collapse
/// into a single fetch.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  /// How long before cached data is considered stale
  stale_time: Duration,
  /// One lock per key with a fetch in progress
  flights: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      stale_time: Duration::seconds(2),
      flights: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Set the default stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Check if cached data is still within the freshness window.
  fn is_fresh(&self, cached_at: DateTime<Utc>, stale_time: Duration) -> bool {
    Utc::now() - cached_at <= stale_time
  }

  /// Freshness window for a key, honoring per-key overrides.
  fn stale_time_for(&self, key: &dyn QueryKey) -> Duration {
    key.stale_time().unwrap_or(self.stale_time)
  }

  /// Get or create the in-flight lock for a key.
  fn flight(&self, hash: &str) -> Result<Arc<tokio::sync::Mutex<()>>> {
    let mut flights = self
      .flights
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(Arc::clone(flights.entry(hash.to_string()).or_default()))
  }

  /// Drop the in-flight lock for a key once its fetch settled.
  fn clear_flight(&self, hash: &str) {
    if let Ok(mut flights) = self.flights.lock() {
      flights.remove(hash);
    }
  }

  /// Fetch a list with cache-first strategy.
  ///
  /// 1. Check cache - if fresh, return immediately
  /// 2. Wait for any in-flight fetch of the same key, then re-check
  /// 3. Fetch from network and update the cache
  ///
  /// Fetch errors propagate to the caller; nothing is cached on failure.
  pub async fn fetch_list<T, F, Fut>(
    &self,
    key: &dyn QueryKey,
    fetcher: F,
  ) -> Result<CacheResult<Vec<T>>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
  {
    let hash = key.cache_hash();
    let stale_time = self.stale_time_for(key);

    // Check cache first
    if let Some(cached) = self.storage.get_query_result::<T>(&hash)? {
      if self.is_fresh(cached.cached_at, stale_time) {
        debug!(query = %key.description(), "cache hit");
        return Ok(CacheResult::from_cache(cached.entities, cached.cached_at));
      }
    }

    // Take the key's flight lock. Whoever holds it fetches; everyone else
    // waits here and then reads what the winner stored.
    let flight = self.flight(&hash)?;
    let guard = flight.lock().await;

    if let Some(cached) = self.storage.get_query_result::<T>(&hash)? {
      if self.is_fresh(cached.cached_at, stale_time) {
        debug!(query = %key.description(), "cache hit after in-flight fetch");
        return Ok(CacheResult::from_cache(cached.entities, cached.cached_at));
      }
    }

    debug!(query = %key.description(), "cache miss, fetching");
    let stored = fetcher().await.and_then(|data| {
      self.storage.store_query_result(&hash, &data)?;
      Ok(data)
    });

    drop(guard);
    self.clear_flight(&hash);

    Ok(CacheResult::from_network(stored?))
  }

  /// Fetch a single entity with caching.
  ///
  /// Same cache-first and in-flight handling as [`fetch_list`], keyed by
  /// entity type and key instead of a query hash.
  ///
  /// [`fetch_list`]: CacheLayer::fetch_list
  pub async fn fetch_one<T, F, Fut>(&self, entity_key: &str, fetcher: F) -> Result<CacheResult<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let flight_key = format!("{}:{}", T::entity_type(), entity_key);

    // Check cache first
    if let Some(cached) = self.storage.get_entity::<T>(entity_key)? {
      if self.is_fresh(cached.cached_at, self.stale_time) {
        debug!(entity_type = T::entity_type(), entity_key, "cache hit");
        return Ok(CacheResult::from_cache(cached.entity, cached.cached_at));
      }
    }

    let flight = self.flight(&flight_key)?;
    let guard = flight.lock().await;

    if let Some(cached) = self.storage.get_entity::<T>(entity_key)? {
      if self.is_fresh(cached.cached_at, self.stale_time) {
        debug!(
          entity_type = T::entity_type(),
          entity_key, "cache hit after in-flight fetch"
        );
        return Ok(CacheResult::from_cache(cached.entity, cached.cached_at));
      }
    }

    debug!(entity_type = T::entity_type(), entity_key, "cache miss, fetching");
    let stored = fetcher().await.and_then(|data| {
      self.storage.store_entity(&data)?;
      Ok(data)
    });

    drop(guard);
    self.clear_flight(&flight_key);

    Ok(CacheResult::from_network(stored?))
  }

  /// Drop the cached result for a query key.
  pub fn invalidate(&self, key: &dyn QueryKey) -> Result<()> {
    debug!(query = %key.description(), "invalidating cached query");
    self.storage.invalidate_query(&key.cache_hash())
  }

  /// Drop a cached entity.
  pub fn invalidate_entity<T: Cacheable>(&self, entity_key: &str) -> Result<()> {
    debug!(
      entity_type = T::entity_type(),
      entity_key, "invalidating cached entity"
    );
    self.storage.invalidate_entity(T::entity_type(), entity_key)
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      stale_time: self.stale_time,
      flights: Arc::clone(&self.flights),
    }
  }
}
