use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::IndexError;

const MAX_ATTEMPTS: u32 = 5;
const INITIAL_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(60);
const BACKOFF_FACTOR: f64 = 2.0;

/// Retry `op` on rate-limit and 5xx responses with exponential backoff plus
/// up-to-50% jitter, capped at `MAX_DELAY`. Any other error is returned
/// immediately — 4xx-other-than-429 is never worth retrying.
pub async fn retry_with_backoff<F, Fut, T>(mut op: F) -> Result<T, IndexError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IndexError>>,
{
    let mut delay = INITIAL_DELAY;

    for attempt in 0..MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retriable() => return Err(e),
            Err(e) if attempt + 1 == MAX_ATTEMPTS => return Err(e),
            Err(e) => {
                let jitter = rand::thread_rng().gen_range(0.0..=0.5);
                let sleep_for = delay.mul_f64(1.0 + jitter).min(MAX_DELAY);
                tracing::warn!(attempt = attempt + 1, ?sleep_for, error = %e, "retrying after backoff");
                tokio::time::sleep(sleep_for).await;
                delay = delay.mul_f64(BACKOFF_FACTOR).min(MAX_DELAY);
            }
        }
    }

    Err(IndexError::RetriesExhausted(MAX_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_immediately_without_retry() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, IndexError>(42) }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_non_retriable_errors() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(IndexError::ClientError { status: 400, body: "bad".to_string() }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_rate_limit_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(IndexError::RateLimited)
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
