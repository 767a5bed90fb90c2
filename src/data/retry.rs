use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};

use crate::errors::{PipelineError, PipelineResult};

/// Explicit retry policy: bounded attempts, exponential backoff with jitter,
/// and a caller-supplied predicate deciding which errors are worth retrying.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Doubling backoff starting at base_delay, capped at max_delay:
    /// 2s -> 4s -> 8s -> 16s -> 30s with the default fetch settings.
    fn backoff(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor(self.base_delay.as_millis() as u64 / 2)
            .max_delay(self.max_delay)
            .map(jitter)
    }

    /// Run `operation` until it succeeds, the error is not retryable, or the
    /// attempt budget is exhausted. The final error surfaces unchanged.
    pub async fn run<T, F, Fut, P>(&self, mut operation: F, retryable: P) -> PipelineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PipelineResult<T>>,
        P: Fn(&PipelineError) -> bool,
    {
        let mut delays = self.backoff();
        let mut attempt = 1usize;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && retryable(&err) => {
                    let wait = delays.next().unwrap_or(self.max_delay);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Retryable error, waiting {:?} before next attempt",
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(2),
        )
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicUsize::new(0);
        let result = fast_policy(3)
            .run(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, PipelineError>(42)
                },
                PipelineError::is_retryable,
            )
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_rate_limits_up_to_budget() {
        let calls = AtomicUsize::new(0);
        let result: PipelineResult<()> = fast_policy(3)
            .run(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(PipelineError::RateLimited {
                        context: "AAPL".into(),
                    })
                },
                PipelineError::is_retryable,
            )
            .await;
        assert!(matches!(result, Err(PipelineError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable_errors() {
        let calls = AtomicUsize::new(0);
        let result: PipelineResult<()> = fast_policy(5)
            .run(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(PipelineError::Authentication("expired".into()))
                },
                PipelineError::is_retryable,
            )
            .await;
        assert!(matches!(result, Err(PipelineError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = fast_policy(5)
            .run(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(PipelineError::RateLimited {
                                context: "NVDA".into(),
                            })
                        } else {
                            Ok("done")
                        }
                    }
                },
                PipelineError::is_retryable,
            )
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
