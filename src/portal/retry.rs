//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::error::ClientError;

/// One try of a logical request; lives only for the duration of the call.
#[derive(Debug, Clone, Copy)]
pub struct RequestAttempt {
  /// 1-based attempt number
  pub number: u32,
  pub started_at: DateTime<Utc>,
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay: Duration::from_millis(1000),
    }
  }
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      base_delay,
    }
  }

  /// Wait after failed attempt `attempt` (1-based): `base_delay * 2^(attempt-1)`.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    self.base_delay.saturating_mul(factor)
  }

  /// Run `op` until it succeeds or the attempts run out.
  ///
  /// Attempts are strictly sequential. The last failure is wrapped in
  /// [`ClientError::Exhausted`].
  pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, ClientError>
  where
    F: FnMut(RequestAttempt) -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
  {
    let mut number = 1;
    loop {
      let attempt = RequestAttempt {
        number,
        started_at: Utc::now(),
      };

      match op(attempt).await {
        Ok(value) => return Ok(value),
        Err(e) if number >= self.max_attempts => {
          return Err(ClientError::Exhausted {
            attempts: number,
            source: Box::new(e),
          });
        }
        Err(e) => {
          let delay = self.delay_after(number);
          tracing::warn!(
            attempt = number,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %e,
            "API request attempt failed"
          );
          tokio::time::sleep(delay).await;
          number += 1;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[test]
  fn test_backoff_doubles() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
    assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
    assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
  }

  #[test]
  fn test_at_least_one_attempt() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
  }

  #[tokio::test]
  async fn test_succeeds_after_transient_failures() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::new(3, Duration::from_millis(1));

    let result = policy
      .run(|attempt| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
          if attempt.number < 3 {
            Err(ClientError::Unsuccessful("not yet".into()))
          } else {
            Ok(attempt.number)
          }
        }
      })
      .await
      .unwrap();

    assert_eq!(result, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_exhaustion_wraps_last_error() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::new(3, Duration::from_millis(1));

    let err = policy
      .run(|attempt| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Err::<(), _>(ClientError::Unsuccessful(format!("boom {}", attempt.number))) }
      })
      .await
      .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    match err {
      ClientError::Exhausted { attempts, source } => {
        assert_eq!(attempts, 3);
        assert_eq!(source.to_string(), "boom 3");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_exhaustion_sleeps_between_attempts_only() {
    let policy = RetryPolicy::default();
    let started = tokio::time::Instant::now();

    let err = policy
      .run(|_| async { Err::<(), _>(ClientError::Unsuccessful("down".into())) })
      .await
      .unwrap_err();

    // 1000 ms after the first failure, 2000 ms after the second, none after the last
    assert_eq!(started.elapsed(), Duration::from_millis(3000));
    assert!(matches!(err, ClientError::Exhausted { attempts: 3, .. }));
  }

  #[tokio::test(start_paused = true)]
  async fn test_single_failure_waits_base_delay() {
    let policy = RetryPolicy::default();
    let started = tokio::time::Instant::now();

    let result = policy
      .run(|attempt| async move {
        if attempt.number == 1 {
          Err(ClientError::Unsuccessful("flaky".into()))
        } else {
          Ok(attempt.number)
        }
      })
      .await
      .unwrap();

    assert_eq!(result, 2);
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
  }
}
