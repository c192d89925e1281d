use rand::Rng;
use std::future::Future;
use std::time::Duration;

use prep_core::config::EngineConfig;
use storage::repository::StorageError;

/// Exponential backoff for transient storage failures.
///
/// Attempt `n` (0-based) waits `base_delay × 2ⁿ` plus up to half the base as
/// jitter. Permanent errors are returned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.persistence_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn delay(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let jitter_cap = u64::try_from(self.base_delay.as_millis() / 2).unwrap_or(u64::MAX);
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_cap)
        };
        backoff.saturating_add(Duration::from_millis(jitter))
    }

    /// Run `op`, retrying transient failures up to `max_retries` times.
    ///
    /// # Errors
    ///
    /// Returns the first permanent error, or the last transient one once
    /// retries are exhausted.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = self.delay(attempt);
                    attempt += 1;
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient storage failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = quick(3)
            .run("test", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StorageError::Connection("reset".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = quick(3)
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::Connection("down".into()))
            })
            .await;
        assert!(matches!(result, Err(StorageError::Connection(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = quick(3)
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::Conflict("stale".into()))
            })
            .await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(40));
        let first = policy.delay(0);
        let third = policy.delay(2);
        assert!(first >= Duration::from_millis(40) && first <= Duration::from_millis(60));
        assert!(third >= Duration::from_millis(160) && third <= Duration::from_millis(180));
    }
}
