//! Bounded retry for Zureo rate limiting.
//!
//! Zureo allows a small fixed number of calls per 30-second window and
//! answers 429 past it. Only [`ZureoError::RateLimited`] is retried; every
//! other error aborts immediately. Once the retry budget is spent the caller
//! gets [`ZureoError::RateLimitExhausted`] instead of looping forever.

use std::future::Future;
use std::time::Duration;

use crate::error::ZureoError;

#[derive(Debug, Clone, Copy)]
pub(crate) struct RateLimitPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry; doubles on each subsequent one.
    pub cooldown: Duration,
}

impl RateLimitPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.cooldown.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Runs `operation` for the page at `offset`, retrying on 429 with
/// exponential backoff (`cooldown × 2^attempt`).
///
/// | Attempt | Sleep before it (cooldown = 45 s) |
/// |---------|-----------------------------------|
/// | 0 (initial) | none |
/// | 1 | 45 s |
/// | 2 | 90 s |
/// | 3 | 180 s |
pub(crate) async fn retry_rate_limited<T, F, Fut>(
    policy: RateLimitPolicy,
    offset: u64,
    mut operation: F,
) -> Result<T, ZureoError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ZureoError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(ZureoError::RateLimited { .. }) if attempt >= policy.max_retries => {
                return Err(ZureoError::RateLimitExhausted {
                    offset,
                    attempts: attempt + 1,
                });
            }
            Err(ZureoError::RateLimited { .. }) => {}
            Err(other) => return Err(other),
        }

        let delay = policy.delay_for(attempt);
        tracing::warn!(
            offset,
            attempt,
            max_retries = policy.max_retries,
            delay_secs = delay.as_secs(),
            "zureo rate limit hit; retrying same offset after cooldown"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_wait(max_retries: u32) -> RateLimitPolicy {
        RateLimitPolicy {
            max_retries,
            cooldown: Duration::ZERO,
        }
    }

    fn rate_limited() -> ZureoError {
        ZureoError::RateLimited {
            endpoint: "product/all".to_owned(),
        }
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RateLimitPolicy {
            max_retries: 5,
            cooldown: Duration::from_secs(45),
        };
        assert_eq!(policy.delay_for(0), Duration::from_secs(45));
        assert_eq!(policy.delay_for(1), Duration::from_secs(90));
        assert_eq!(policy.delay_for(3), Duration::from_secs(360));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_rate_limited(no_wait(3), 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ZureoError>(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_rate_limit_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_rate_limited(no_wait(3), 2000, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(rate_limited())
                } else {
                    Ok::<u32, ZureoError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_offset_and_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_rate_limited(no_wait(2), 3000, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ZureoError>(rate_limited())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(
            matches!(
                result,
                Err(ZureoError::RateLimitExhausted {
                    offset: 3000,
                    attempts: 3
                })
            ),
            "expected RateLimitExhausted, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_rate_limited(no_wait(3), 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ZureoError>(ZureoError::UnexpectedStatus {
                    status: 500,
                    context: "product/all from=0".to_owned(),
                    body: "boom".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ZureoError::UnexpectedStatus { .. })));
    }
}
