//! Request counters for the portal client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceStats {
  pub total_requests: u64,
  pub total_errors: u64,
  /// Percentage of logical requests that failed, e.g. `"33.33%"`
  pub error_rate: String,
  /// Mean time per logical request, e.g. `"12.50ms"`
  pub average_response_time: String,
  pub cache_size: usize,
}

/// Counts logical requests (not individual attempts). Cache hits are not counted.
#[derive(Debug, Default)]
pub struct Metrics {
  requests: AtomicU64,
  errors: AtomicU64,
  total_micros: AtomicU64,
}

impl Metrics {
  pub fn record(&self, elapsed: Duration, failed: bool) {
    self.requests.fetch_add(1, Ordering::Relaxed);
    if failed {
      self.errors.fetch_add(1, Ordering::Relaxed);
    }
    let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
    self.total_micros.fetch_add(micros, Ordering::Relaxed);
  }

  pub fn snapshot(&self, cache_size: usize) -> PerformanceStats {
    let requests = self.requests.load(Ordering::Relaxed);
    let errors = self.errors.load(Ordering::Relaxed);
    let total_ms = self.total_micros.load(Ordering::Relaxed) as f64 / 1000.0;

    let (error_rate, average) = if requests == 0 {
      (0.0, 0.0)
    } else {
      (
        errors as f64 / requests as f64 * 100.0,
        total_ms / requests as f64,
      )
    };

    PerformanceStats {
      total_requests: requests,
      total_errors: errors,
      error_rate: format!("{:.2}%", error_rate),
      average_response_time: format!("{:.2}ms", average),
      cache_size,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_metrics() {
    let stats = Metrics::default().snapshot(0);
    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.error_rate, "0.00%");
    assert_eq!(stats.average_response_time, "0.00ms");
  }

  #[test]
  fn test_rates_and_averages() {
    let metrics = Metrics::default();
    metrics.record(Duration::from_millis(10), false);
    metrics.record(Duration::from_millis(20), false);
    metrics.record(Duration::from_millis(30), true);

    let stats = metrics.snapshot(2);
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.total_errors, 1);
    assert_eq!(stats.error_rate, "33.33%");
    assert_eq!(stats.average_response_time, "20.00ms");
    assert_eq!(stats.cache_size, 2);
  }

  #[test]
  fn test_oversized_duration_saturates() {
    let metrics = Metrics::default();
    metrics.record(Duration::MAX, false);

    let stats = metrics.snapshot(0);
    assert_eq!(stats.total_requests, 1);
    assert!(stats.average_response_time.starts_with("184467440737095"));
  }
}
