//! Exponential backoff around fallible async operations (C1).
//!
//! Generalizes the hand-rolled retry loops providers used to carry one-per-adapter
//! (see the Whisper client this codebase started from) into a single reusable helper.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub min_delay_ms: u64,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            min_delay_ms: 500,
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, min_delay_ms: u64, factor: f64) -> Self {
        Self {
            retries,
            min_delay_ms,
            factor,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let ms = (self.min_delay_ms as f64) * self.factor.powi(attempt as i32 - 1);
        Duration::from_millis(ms.floor() as u64)
    }
}

/// Runs `op` until it succeeds or the retry budget is exhausted, sleeping
/// `floor(min_delay * factor^(attempt-1))` between attempts. No jitter, no
/// per-attempt timeout — callers impose their own deadline around the whole call.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt >= policy.retries {
                    return Err(e);
                }
                attempt += 1;
                let delay = policy.delay_for_attempt(attempt);
                warn!(attempt, %e, "operation failed, retrying after {:?}", delay);
                tokio::time::sleep(delay).await;
                debug!(attempt, "retrying now");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_immediately_without_sleeping() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: std::result::Result<u32, &str> = retry(RetryPolicy::default(), || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_budget_exhausted_and_reraises_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let policy = RetryPolicy::new(3, 1, 2.0);
        let result: std::result::Result<u32, String> = retry(policy, || {
            let calls = calls2.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("attempt {n} failed"))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(result.unwrap_err(), "attempt 4 failed");
    }

    #[tokio::test]
    async fn succeeds_on_a_later_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let policy = RetryPolicy::new(3, 1, 2.0);
        let result: std::result::Result<u32, &str> = retry(policy, || {
            let calls = calls2.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err("not yet")
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delay_arithmetic_matches_spec_example() {
        let policy = RetryPolicy::new(3, 100, 2.0);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }
}
