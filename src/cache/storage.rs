//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::Cacheable;

/// Result of a cached query lookup.
#[derive(Debug, Clone)]
pub struct CachedQueryResult<T> {
  /// The cached entities in order
  pub entities: Vec<T>,
  /// When the query result was cached
  pub cached_at: DateTime<Utc>,
}

/// A single cached entity.
#[derive(Debug, Clone)]
pub struct CachedEntity<T> {
  /// The cached entity
  pub entity: T,
  /// When the entity was cached
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Store entities from a query result.
  fn store_query_result<T: Cacheable>(&self, key: &str, entities: &[T]) -> Result<()>;

  /// Get cached entities for a query.
  fn get_query_result<T: Cacheable>(&self, key: &str) -> Result<Option<CachedQueryResult<T>>>;

  /// Get a single entity by key.
  fn get_entity<T: Cacheable>(&self, entity_key: &str) -> Result<Option<CachedEntity<T>>>;

  /// Store a single entity.
  fn store_entity<T: Cacheable>(&self, entity: &T) -> Result<()>;

  /// Drop a cached query result. Missing entries are not an error.
  fn invalidate_query(&self, key: &str) -> Result<()>;

  /// Drop a cached entity. Missing entries are not an error.
  fn invalidate_entity(&self, entity_type: &str, entity_key: &str) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn store_query_result<T: Cacheable>(&self, _key: &str, _entities: &[T]) -> Result<()> {
    Ok(()) // Discard
  }

  fn get_query_result<T: Cacheable>(&self, _key: &str) -> Result<Option<CachedQueryResult<T>>> {
    Ok(None) // Always miss
  }

  fn get_entity<T: Cacheable>(&self, _entity_key: &str) -> Result<Option<CachedEntity<T>>> {
    Ok(None) // Always miss
  }

  fn store_entity<T: Cacheable>(&self, _entity: &T) -> Result<()> {
    Ok(()) // Discard
  }

  fn invalidate_query(&self, _key: &str) -> Result<()> {
    Ok(()) // Nothing stored
  }

  fn invalidate_entity(&self, _entity_type: &str, _entity_key: &str) -> Result<()> {
    Ok(()) // Nothing stored
  }
}

/// In-memory cache storage.
///
/// Entries live for the duration of the process and are only removed by
/// explicit invalidation; freshness is the cache layer's concern. Entities
/// are stored as serialized JSON so the storage stays untyped, the same
/// shape a persistent backend would use.
#[derive(Default)]
pub struct MemoryStorage {
  inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
  queries: HashMap<String, QueryEntry>,
  entities: HashMap<(String, String), EntityEntry>,
}

struct QueryEntry {
  entity_type: &'static str,
  data: Vec<u8>,
  cached_at: DateTime<Utc>,
}

struct EntityEntry {
  data: Vec<u8>,
  cached_at: DateTime<Utc>,
}

impl MemoryStorage {
  /// Create an empty in-memory storage.
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
    self.inner.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl CacheStorage for MemoryStorage {
  fn store_query_result<T: Cacheable>(&self, key: &str, entities: &[T]) -> Result<()> {
    let data =
      serde_json::to_vec(entities).map_err(|e| eyre!("Failed to serialize entities: {}", e))?;

    let mut inner = self.lock()?;
    inner.queries.insert(
      key.to_string(),
      QueryEntry {
        entity_type: T::entity_type(),
        data,
        cached_at: Utc::now(),
      },
    );

    Ok(())
  }

  fn get_query_result<T: Cacheable>(&self, key: &str) -> Result<Option<CachedQueryResult<T>>> {
    let inner = self.lock()?;

    let entry = match inner.queries.get(key) {
      Some(entry) if entry.entity_type == T::entity_type() => entry,
      _ => return Ok(None),
    };

    let entities: Vec<T> = serde_json::from_slice(&entry.data)
      .map_err(|e| eyre!("Failed to deserialize entities: {}", e))?;

    Ok(Some(CachedQueryResult {
      entities,
      cached_at: entry.cached_at,
    }))
  }

  fn get_entity<T: Cacheable>(&self, entity_key: &str) -> Result<Option<CachedEntity<T>>> {
    let inner = self.lock()?;

    let entry = match inner
      .entities
      .get(&(T::entity_type().to_string(), entity_key.to_string()))
    {
      Some(entry) => entry,
      None => return Ok(None),
    };

    let entity: T = serde_json::from_slice(&entry.data)
      .map_err(|e| eyre!("Failed to deserialize entity: {}", e))?;

    Ok(Some(CachedEntity {
      entity,
      cached_at: entry.cached_at,
    }))
  }

  fn store_entity<T: Cacheable>(&self, entity: &T) -> Result<()> {
    let data =
      serde_json::to_vec(entity).map_err(|e| eyre!("Failed to serialize entity: {}", e))?;

    let mut inner = self.lock()?;
    inner.entities.insert(
      (T::entity_type().to_string(), entity.cache_key()),
      EntityEntry {
        data,
        cached_at: Utc::now(),
      },
    );

    Ok(())
  }

  fn invalidate_query(&self, key: &str) -> Result<()> {
    let mut inner = self.lock()?;
    inner.queries.remove(key);
    Ok(())
  }

  fn invalidate_entity(&self, entity_type: &str, entity_key: &str) -> Result<()> {
    let mut inner = self.lock()?;
    inner
      .entities
      .remove(&(entity_type.to_string(), entity_key.to_string()));
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Item {
    id: u64,
    name: String,
  }

  impl Cacheable for Item {
    fn cache_key(&self) -> String {
      self.id.to_string()
    }

    fn entity_type() -> &'static str {
      "item"
    }
  }

  fn item(id: u64, name: &str) -> Item {
    Item {
      id,
      name: name.to_string(),
    }
  }

  #[test]
  fn test_query_result_roundtrip() {
    let storage = MemoryStorage::new();
    let items = vec![item(1, "first"), item(2, "second")];

    storage.store_query_result("list", &items).unwrap();
    let cached = storage.get_query_result::<Item>("list").unwrap().unwrap();

    assert_eq!(cached.entities, items);
  }

  #[test]
  fn test_query_result_misses_on_unknown_key() {
    let storage = MemoryStorage::new();
    assert!(storage.get_query_result::<Item>("nope").unwrap().is_none());
  }

  #[test]
  fn test_entity_roundtrip() {
    let storage = MemoryStorage::new();
    let entity = item(7, "seventh");

    storage.store_entity(&entity).unwrap();
    let cached = storage.get_entity::<Item>("7").unwrap().unwrap();

    assert_eq!(cached.entity, entity);
  }

  #[test]
  fn test_invalidate_query_removes_entry() {
    let storage = MemoryStorage::new();
    storage.store_query_result("list", &[item(1, "one")]).unwrap();

    storage.invalidate_query("list").unwrap();

    assert!(storage.get_query_result::<Item>("list").unwrap().is_none());
  }

  #[test]
  fn test_invalidate_entity_removes_entry() {
    let storage = MemoryStorage::new();
    storage.store_entity(&item(3, "three")).unwrap();

    storage.invalidate_entity("item", "3").unwrap();

    assert!(storage.get_entity::<Item>("3").unwrap().is_none());
  }

  #[test]
  fn test_invalidate_missing_entry_is_ok() {
    let storage = MemoryStorage::new();
    storage.invalidate_query("absent").unwrap();
    storage.invalidate_entity("item", "absent").unwrap();
  }

  #[test]
  fn test_noop_storage_never_stores() {
    let storage = NoopStorage;
    storage.store_query_result("list", &[item(1, "one")]).unwrap();
    storage.store_entity(&item(2, "two")).unwrap();

    assert!(storage.get_query_result::<Item>("list").unwrap().is_none());
    assert!(storage.get_entity::<Item>("2").unwrap().is_none());
  }
}
