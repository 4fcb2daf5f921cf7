//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A stored response payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  pub key: String,
  pub payload: Value,
  pub stored_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Storage does not interpret timestamps; freshness is decided by the layer.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under `key`, fresh or not.
  fn get(&self, key: &str) -> Option<CacheEntry>;

  /// Store an entry, replacing any previous one with the same key.
  fn put(&self, entry: CacheEntry);

  /// Remove every entry.
  fn clear(&self);

  /// Number of stored entries.
  fn len(&self) -> usize;

  /// Stored keys, sorted.
  fn keys(&self) -> Vec<String>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Option<CacheEntry> {
    None // Always miss
  }

  fn put(&self, _entry: CacheEntry) {}

  fn clear(&self) {}

  fn len(&self) -> usize {
    0
  }

  fn keys(&self) -> Vec<String> {
    Vec::new()
  }
}

/// Process-lifetime map of entries.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Entries are plain data, so a panic elsewhere cannot leave them half-written.
  fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Option<CacheEntry> {
    self.entries().get(key).cloned()
  }

  fn put(&self, entry: CacheEntry) {
    self.entries().insert(entry.key.clone(), entry);
  }

  fn clear(&self) {
    self.entries().clear();
  }

  fn len(&self) -> usize {
    self.entries().len()
  }

  fn keys(&self) -> Vec<String> {
    let mut keys: Vec<String> = self.entries().keys().cloned().collect();
    keys.sort();
    keys
  }
}
