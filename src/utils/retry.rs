use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Bounded attempts with a fixed pause in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Runs `operation` until it succeeds or the attempts are used up, then
/// returns the last error.
pub async fn retry_fixed<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(operation = %operation_name, attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if attempt >= max_attempts => {
                warn!(
                    operation = %operation_name,
                    attempt,
                    error = %e,
                    "Operation failed after max attempts"
                );
                return Err(e);
            }
            Err(e) => {
                debug!(
                    operation = %operation_name,
                    attempt,
                    error = %e,
                    delay_ms = policy.backoff.as_millis() as u64,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(policy.backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::default();

        let result: Result<u32, String> = retry_fixed(&policy, "test", || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(format!("attempt {n}"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_error_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff: Duration::from_millis(500),
        };
        let start = tokio::time::Instant::now();

        let result: Result<(), String> = retry_fixed(&policy, "test", || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err(format!("attempt {n}"))
        })
        .await;

        assert_eq!(result, Err("attempt 5".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
    }
}
