//! Capped exponential-backoff retry for status fetches.
//!
//! A failed fetch is retried up to [`RetryConfig::max_attempts`] times in
//! total, with the delay between attempts growing by
//! [`RetryConfig::multiplier`] up to [`RetryConfig::max_delay`].
//! Authorization failures are returned immediately.

use std::time::Duration;

use reel_core::StatusSnapshot;
use tokio_util::sync::CancellationToken;

use crate::api::{StatusApiError, StatusSource, StatusTarget};

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay, clamped to [`RetryConfig::max_delay`].
pub fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Fetch the status for `target`, retrying transient failures.
///
/// Returns `None` if `cancel` fires first, otherwise the snapshot or the
/// error of the last attempt.
pub async fn fetch_with_retry<S>(
    source: &S,
    target: &StatusTarget,
    config: &RetryConfig,
    cancel: &CancellationToken,
) -> Option<Result<StatusSnapshot, StatusApiError>>
where
    S: StatusSource + ?Sized,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = source.get_status(target) => result,
        };

        let err = match result {
            Ok(snapshot) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Status fetch recovered");
                }
                return Some(Ok(snapshot));
            }
            Err(e) => e,
        };

        if !err.is_retryable() || attempt >= max_attempts {
            tracing::warn!(attempt, error = %err, "Status fetch failed, giving up");
            return Some(Err(err));
        }

        tracing::warn!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Status fetch failed, retrying",
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        delay = next_delay(delay, config);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;

    /// Fails the first `failures` calls, then succeeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        unauthorized: bool,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                unauthorized: false,
            }
        }
    }

    #[async_trait]
    impl StatusSource for Flaky {
        async fn get_status(&self, _: &StatusTarget) -> Result<StatusSnapshot, StatusApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                if self.unauthorized {
                    return Err(StatusApiError::Unauthorized { status: 401 });
                }
                return Err(StatusApiError::Api {
                    status: 503,
                    body: "busy".into(),
                });
            }
            Ok(StatusSnapshot::default())
        }
    }

    fn target() -> StatusTarget {
        StatusTarget::new("script", "version")
    }

    // -- next_delay -----------------------------------------------------------

    #[test]
    fn next_delay_doubles() {
        let config = RetryConfig::default();
        assert_eq!(next_delay(Duration::from_secs(1), &config), Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(next_delay(Duration::from_secs(8), &config), Duration::from_secs(10));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = RetryConfig::default();
        let mut delay = config.initial_delay;
        for expected_secs in [1, 2, 4, 8, 16, 30, 30] {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    // -- fetch_with_retry -----------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let source = Flaky::new(2);
        let cancel = CancellationToken::new();

        let result = fetch_with_retry(&source, &target(), &RetryConfig::default(), &cancel).await;
        assert_matches!(result, Some(Ok(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let source = Flaky::new(10);
        let cancel = CancellationToken::new();

        let result = fetch_with_retry(&source, &target(), &RetryConfig::default(), &cancel).await;
        assert_matches!(result, Some(Err(StatusApiError::Api { status: 503, .. })));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_is_not_retried() {
        let source = Flaky {
            unauthorized: true,
            ..Flaky::new(10)
        };
        let cancel = CancellationToken::new();

        let result = fetch_with_retry(&source, &target(), &RetryConfig::default(), &cancel).await;
        assert_matches!(result, Some(Err(StatusApiError::Unauthorized { status: 401 })));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_returns_none() {
        let source = Flaky::new(0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = fetch_with_retry(&source, &target(), &RetryConfig::default(), &cancel).await;
        assert!(result.is_none());
    }
}
