use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::Result;

/// Bounded, fixed-delay retry of a single logical operation.
///
/// Lives for exactly one in-flight operation; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Resolves the per-call retry override against the executor default.
    ///
    /// `None` means the default (2 retries, 3 total attempts); `Some(0)`
    /// means exactly one attempt; `Some(k)` means `k + 1` total attempts.
    pub(crate) fn resolve(retries: Option<u32>, default_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: retries.unwrap_or(default_retries),
            delay,
        }
    }

    /// Runs `attempt_fn` until it succeeds, fails terminally, or exhausts
    /// the retry budget. The last error is the one propagated.
    ///
    /// `attempt_fn` must produce a byte-identical request each time it is
    /// called; the executor guarantees this by handing it the same encoded
    /// body for every attempt.
    pub(crate) async fn run<F, Fut, T>(&self, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if err.is_transient() && attempt < self.max_retries {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            attempt,
                            max_retries = self.max_retries,
                            delay_ms = self.delay.as_millis() as u64,
                            "retrying after transient failure: {err}"
                        );
                        sleep(self.delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::RetryPolicy;
    use crate::ExecError;

    fn transient() -> ExecError {
        ExecError::Http {
            status: 500,
            body: "boom".to_owned(),
        }
    }

    fn terminal() -> ExecError {
        ExecError::Http {
            status: 400,
            body: "bad request".to_owned(),
        }
    }

    #[test]
    fn resolve_maps_overrides_to_attempt_budgets() {
        let delay = Duration::from_millis(1);
        assert_eq!(
            RetryPolicy::resolve(None, 2, delay),
            RetryPolicy {
                max_retries: 2,
                delay
            }
        );
        assert_eq!(RetryPolicy::resolve(Some(0), 2, delay).max_retries, 0);
        assert_eq!(RetryPolicy::resolve(Some(5), 2, delay).max_retries, 5);
    }

    #[tokio::test]
    async fn persistent_transient_failure_exhausts_budget() {
        let policy = RetryPolicy::resolve(None, 2, Duration::from_millis(1));
        let attempts = AtomicU32::new(0);

        let result: crate::Result<()> = policy
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        assert!(matches!(result, Err(ExecError::Http { status: 500, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn success_after_one_transient_failure_stops_retrying() {
        let policy = RetryPolicy::resolve(None, 2, Duration::from_millis(1));
        let attempts = AtomicU32::new(0);

        let result = policy
            .run(|| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(transient())
                    } else {
                        Ok("imagery")
                    }
                }
            })
            .await;

        assert_eq!(result.expect("must succeed"), "imagery");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let policy = RetryPolicy::resolve(Some(0), 2, Duration::from_millis(1));
        let attempts = AtomicU32::new(0);

        let result: crate::Result<()> = policy
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn terminal_errors_skip_the_retry_budget() {
        let policy = RetryPolicy::resolve(Some(5), 2, Duration::from_millis(1));
        let attempts = AtomicU32::new(0);

        let result: crate::Result<()> = policy
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(terminal()) }
            })
            .await;

        assert!(matches!(result, Err(ExecError::Http { status: 400, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
