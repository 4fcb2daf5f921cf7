//! Cache layer that applies the time-to-live policy over a storage backend.

use chrono::Duration;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::storage::{CacheEntry, CacheStorage};
use super::traits::{Clock, SystemClock};

/// Snapshot of cache contents for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
  pub size: usize,
  pub ttl_secs: i64,
  pub keys: Vec<String>,
}

/// Keyed response cache with read-time expiry.
///
/// An entry is fresh while `now - stored_at < ttl`; stale entries are never
/// returned and are simply overwritten by the next successful store.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  clock: Arc<dyn Clock>,
  /// How long a stored entry may be served
  ttl: Duration,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
      clock: Arc::new(SystemClock),
      ttl: Duration::minutes(5),
    }
  }

  /// Set the time-to-live for cached entries.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Replace the clock used for timestamps and expiry.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Check if an entry has outlived the TTL.
  fn is_expired(&self, entry: &CacheEntry) -> bool {
    self.clock.now() - entry.stored_at >= self.ttl
  }

  /// Fresh entry for `key`, or `None` on a miss or an expired entry.
  pub fn lookup(&self, key: &str) -> Option<CacheEntry> {
    let entry = self.storage.get(key)?;
    if self.is_expired(&entry) {
      tracing::trace!(key, "Cache entry expired");
      return None;
    }
    Some(entry)
  }

  /// Store `payload` under `key`, stamped with the current time.
  pub fn store(&self, key: &str, payload: Value) {
    self.storage.put(CacheEntry {
      key: key.to_string(),
      payload,
      stored_at: self.clock.now(),
    });
  }

  pub fn clear(&self) {
    self.storage.clear();
  }

  pub fn len(&self) -> usize {
    self.storage.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn stats(&self) -> CacheStats {
    CacheStats {
      size: self.storage.len(),
      ttl_secs: self.ttl.num_seconds(),
      keys: self.storage.keys(),
    }
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      ttl: self.ttl,
    }
  }
}

#[cfg(test)]
pub(crate) mod test_support {
  use super::*;
  use chrono::{DateTime, Utc};
  use std::sync::Mutex;

  /// Clock that only moves when told to.
  pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
  }

  impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
      Self {
        now: Mutex::new(start),
      }
    }

    pub fn advance(&self, by: Duration) {
      let mut now = self.now.lock().unwrap();
      *now += by;
    }
  }

  impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
      *self.now.lock().unwrap()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::test_support::ManualClock;
  use super::*;
  use crate::cache::storage::{MemoryStorage, NoopStorage};
  use chrono::{TimeZone, Utc};
  use serde_json::json;

  fn layer_with_clock() -> (CacheLayer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
      Utc.with_ymd_and_hms(2025, 8, 13, 9, 0, 0).unwrap(),
    ));
    let layer = CacheLayer::new(MemoryStorage::new()).with_clock(clock.clone());
    (layer, clock)
  }

  #[test]
  fn test_hit_just_before_ttl() {
    let (layer, clock) = layer_with_clock();
    layer.store("k", json!({"a": 1}));

    clock.advance(Duration::milliseconds(299_999));
    let entry = layer.lookup("k").expect("entry should still be fresh");
    assert_eq!(entry.payload, json!({"a": 1}));
  }

  #[test]
  fn test_miss_just_after_ttl() {
    let (layer, clock) = layer_with_clock();
    layer.store("k", json!({"a": 1}));

    clock.advance(Duration::milliseconds(300_001));
    assert!(layer.lookup("k").is_none());
  }

  #[test]
  fn test_miss_exactly_at_ttl() {
    let (layer, clock) = layer_with_clock();
    layer.store("k", json!(1));

    clock.advance(Duration::milliseconds(300_000));
    assert!(layer.lookup("k").is_none());
  }

  #[test]
  fn test_store_after_expiry_refreshes_entry() {
    let (layer, clock) = layer_with_clock();
    layer.store("k", json!("old"));
    clock.advance(Duration::minutes(6));
    assert!(layer.lookup("k").is_none());

    layer.store("k", json!("new"));
    assert_eq!(layer.lookup("k").unwrap().payload, json!("new"));
    assert_eq!(layer.len(), 1);
  }

  #[test]
  fn test_custom_ttl() {
    let (layer, clock) = layer_with_clock();
    let layer = layer.with_ttl(Duration::seconds(10));
    layer.store("k", json!(1));

    clock.advance(Duration::seconds(11));
    assert!(layer.lookup("k").is_none());
  }

  #[test]
  fn test_stats_and_clear() {
    let (layer, _clock) = layer_with_clock();
    layer.store("b", json!(1));
    layer.store("a", json!(2));

    let stats = layer.stats();
    assert_eq!(stats.size, 2);
    assert_eq!(stats.ttl_secs, 300);
    assert_eq!(stats.keys, vec!["a".to_string(), "b".to_string()]);

    layer.clear();
    assert!(layer.is_empty());
  }

  #[test]
  fn test_disabled_cache_never_hits() {
    let layer = CacheLayer::new(NoopStorage);
    layer.store("k", json!(1));
    assert!(layer.lookup("k").is_none());
  }

  #[test]
  fn test_clones_share_storage() {
    let (layer, _clock) = layer_with_clock();
    let other = layer.clone();
    layer.store("k", json!(1));
    assert!(other.lookup("k").is_some());
  }
}
