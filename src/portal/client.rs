//! Low-level API client: cache lookup, retried network call, cache store.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheLayer, CacheResult, CacheStats, MemoryStorage, NoopStorage, QueryKey};
use crate::config::ClientConfig;
use crate::types::ResponseEnvelope;

use super::cache::RequestKey;
use super::error::ClientError;
use super::metrics::{Metrics, PerformanceStats};
use super::retry::RetryPolicy;
use super::transport::{HttpTransport, RequestOptions, Transport};

/// API client with a response cache and bounded retries.
#[derive(Clone)]
pub struct ApiClient {
  base_url: String,
  transport: Arc<dyn Transport>,
  cache: CacheLayer,
  retry: RetryPolicy,
  metrics: Arc<Metrics>,
}

impl ApiClient {
  /// Create a client over the HTTP transport using `config`.
  pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
    let transport = HttpTransport::new()?;
    Ok(Self::with_transport(config, Arc::new(transport)))
  }

  /// Create a client over any transport. Cache and retry settings come from `config`.
  pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
    let cache = if config.cache_enabled {
      CacheLayer::new(MemoryStorage::new())
    } else {
      CacheLayer::new(NoopStorage)
    };
    let ttl = chrono::Duration::from_std(config.cache_ttl()).unwrap_or(cache.ttl());

    Self {
      base_url: config.base_url.trim_end_matches('/').to_string(),
      transport,
      cache: cache.with_ttl(ttl),
      retry: RetryPolicy::new(config.retry_attempts, config.retry_delay()),
      metrics: Arc::new(Metrics::default()),
    }
  }

  /// Replace the cache layer (tests use this to inject a clock).
  pub fn with_cache(mut self, cache: CacheLayer) -> Self {
    self.cache = cache;
    self
  }

  fn url_for(&self, endpoint: &str) -> String {
    format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
  }

  /// Fetch `endpoint`, serving a fresh cached payload when allowed.
  ///
  /// Network failures, error statuses and undecodable bodies are retried with
  /// exponential backoff; the last failure is returned as
  /// [`ClientError::Exhausted`]. Only envelopes with `success: true` are cached.
  pub async fn request(
    &self,
    endpoint: &str,
    options: &RequestOptions,
  ) -> Result<CacheResult<ResponseEnvelope>, ClientError> {
    let key = RequestKey { endpoint, options };
    let hash = key.cache_hash();

    if options.use_cache {
      if let Some(entry) = self.cache.lookup(&hash) {
        match serde_json::from_value::<ResponseEnvelope>(entry.payload) {
          Ok(envelope) => {
            tracing::debug!(request = %key.description(), "Cache hit");
            return Ok(CacheResult::from_cache(envelope, entry.stored_at));
          }
          Err(e) => tracing::warn!(request = %key.description(), "Discarding cached payload: {}", e),
        }
      }
    }

    let url = self.url_for(endpoint);
    let started = Instant::now();

    let outcome = self
      .retry
      .run(|attempt| {
        let transport = Arc::clone(&self.transport);
        let url = url.clone();
        async move {
          tracing::debug!(
            attempt = attempt.number,
            started_at = %attempt.started_at,
            url = %url,
            "API request"
          );
          let payload = transport.send(&url, options).await?;
          let envelope: ResponseEnvelope = serde_json::from_value(payload.clone())?;
          Ok((payload, envelope))
        }
      })
      .await;

    self.metrics.record(started.elapsed(), outcome.is_err());

    let (payload, envelope) = outcome.map_err(|e| {
      tracing::error!(request = %key.description(), "{}", e);
      e
    })?;

    if options.use_cache && envelope.success {
      self.cache.store(&hash, payload);
    }

    Ok(CacheResult::from_network(envelope))
  }

  pub fn clear_cache(&self) {
    self.cache.clear();
    tracing::info!("API cache cleared");
  }

  pub fn cache_stats(&self) -> CacheStats {
    self.cache.stats()
  }

  pub fn performance_stats(&self) -> PerformanceStats {
    self.metrics.snapshot(self.cache.len())
  }
}


#[cfg(test)]
mod tests {
  use super::test_support::{fast_config, ScriptedTransport};
  use super::*;
  use crate::cache::test_support::ManualClock;
  use crate::cache::CacheSource;
  use chrono::{TimeZone, Utc};
  use serde_json::json;

  fn ok_body(data: serde_json::Value) -> serde_json::Value {
    json!({"success": true, "timestamp": "2025-08-13T09:00:00Z", "data": data})
  }

  #[tokio::test]
  async fn test_second_call_within_ttl_uses_cache() {
    let transport = Arc::new(ScriptedTransport::new().respond(ok_body(json!([1, 2]))));
    let client = ApiClient::with_transport(&fast_config(), transport.clone());

    let first = client.request("properties", &RequestOptions::default()).await.unwrap();
    let second = client.request("properties", &RequestOptions::default()).await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data.data, Some(json!([1, 2])));
    assert_eq!(transport.calls(), vec!["http://portal.test/api/properties"]);
  }

  #[tokio::test]
  async fn test_expired_entry_triggers_refetch() {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 8, 13, 9, 0, 0).unwrap()));
    let transport = Arc::new(
      ScriptedTransport::new()
        .respond(ok_body(json!("old")))
        .respond(ok_body(json!("new"))),
    );
    let client = ApiClient::with_transport(&fast_config(), transport.clone())
      .with_cache(CacheLayer::new(MemoryStorage::new()).with_clock(clock.clone()));

    client.request("stats", &RequestOptions::default()).await.unwrap();
    clock.advance(chrono::Duration::milliseconds(299_999));
    let hit = client.request("stats", &RequestOptions::default()).await.unwrap();
    assert_eq!(hit.source, CacheSource::Cache);

    clock.advance(chrono::Duration::milliseconds(2));
    let refreshed = client.request("stats", &RequestOptions::default()).await.unwrap();
    assert_eq!(refreshed.source, CacheSource::Network);
    assert_eq!(refreshed.data.data, Some(json!("new")));
    assert_eq!(transport.calls().len(), 2);
  }

  #[tokio::test]
  async fn test_uncached_requests_always_hit_network() {
    let transport = Arc::new(
      ScriptedTransport::new()
        .respond(ok_body(json!(1)))
        .respond(ok_body(json!(2))),
    );
    let client = ApiClient::with_transport(&fast_config(), transport.clone());

    client.request("health", &RequestOptions::uncached()).await.unwrap();
    client.request("health", &RequestOptions::uncached()).await.unwrap();

    assert_eq!(transport.calls().len(), 2);
    assert_eq!(client.cache_stats().size, 0);
  }

  #[tokio::test]
  async fn test_recovers_after_failures() {
    for failures in 0..3 {
      let transport = Arc::new(ScriptedTransport::new().fail(failures).respond(ok_body(json!("ok"))));
      let client = ApiClient::with_transport(&fast_config(), transport.clone());

      let result = client.request("properties", &RequestOptions::default()).await.unwrap();

      assert_eq!(result.data.data, Some(json!("ok")));
      assert_eq!(transport.calls().len(), failures + 1);
    }
  }

  #[tokio::test]
  async fn test_gives_up_after_three_attempts() {
    let transport = Arc::new(ScriptedTransport::new().fail(3).respond(ok_body(json!("late"))));
    let client = ApiClient::with_transport(&fast_config(), transport.clone());

    let err = client
      .request("properties", &RequestOptions::default())
      .await
      .unwrap_err();

    assert!(matches!(err, ClientError::Exhausted { attempts: 3, .. }));
    assert_eq!(transport.calls().len(), 3);

    let stats = client.performance_stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.total_errors, 1);
  }

  #[tokio::test]
  async fn test_malformed_envelope_is_retried() {
    let transport = Arc::new(
      ScriptedTransport::new()
        .respond(json!("not an envelope"))
        .respond(ok_body(json!([]))),
    );
    let client = ApiClient::with_transport(&fast_config(), transport.clone());

    let result = client.request("schools", &RequestOptions::default()).await.unwrap();

    assert!(result.data.success);
    assert_eq!(transport.calls().len(), 2);
  }

  #[tokio::test]
  async fn test_unsuccessful_envelope_is_not_cached() {
    let failure = json!({"success": false, "message": "Property not found"});
    let transport = Arc::new(ScriptedTransport::new().respond(failure.clone()).respond(failure));
    let client = ApiClient::with_transport(&fast_config(), transport.clone());

    let first = client.request("properties/9", &RequestOptions::default()).await.unwrap();
    assert!(!first.data.success);
    client.request("properties/9", &RequestOptions::default()).await.unwrap();

    assert_eq!(transport.calls().len(), 2);
    assert_eq!(client.cache_stats().size, 0);
  }

  #[tokio::test]
  async fn test_disabled_cache_config() {
    let transport = Arc::new(
      ScriptedTransport::new()
        .respond(ok_body(json!(1)))
        .respond(ok_body(json!(2))),
    );
    let config = ClientConfig {
      cache_enabled: false,
      ..fast_config()
    };
    let client = ApiClient::with_transport(&config, transport.clone());

    client.request("stats", &RequestOptions::default()).await.unwrap();
    client.request("stats", &RequestOptions::default()).await.unwrap();

    assert_eq!(transport.calls().len(), 2);
  }

  #[tokio::test]
  async fn test_clear_cache() {
    let transport = Arc::new(
      ScriptedTransport::new()
        .respond(ok_body(json!(1)))
        .respond(ok_body(json!(2))),
    );
    let client = ApiClient::with_transport(&fast_config(), transport.clone());

    client.request("stats", &RequestOptions::default()).await.unwrap();
    assert_eq!(client.cache_stats().size, 1);
    client.clear_cache();
    client.request("stats", &RequestOptions::default()).await.unwrap();

    assert_eq!(transport.calls().len(), 2);
  }
}
