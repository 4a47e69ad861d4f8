//! Bounded-backoff retry for flaky external calls.
//!
//! Fixed attempt count, exponential backoff, no built-in cancellation —
//! callers needing a deadline impose one via [`run_with_deadline`].

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error> {
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Run `op` up to `policy.max_attempts` times, sleeping between attempts
/// with exponentially growing delay (capped at `max_delay`).
pub async fn run<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, RetryError<E>>
where
    E: std::error::Error,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut delay = policy.base_delay;
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(policy.max_delay);
        }
    }

    Err(RetryError::Exhausted {
        attempts,
        source: last_err.expect("at least one attempt ran"),
    })
}

/// Like [`run`], but bounded by a caller-owned deadline covering all
/// attempts and backoff sleeps together.
pub async fn run_with_deadline<T, E, F, Fut>(
    policy: RetryPolicy,
    deadline: Duration,
    op: F,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, run(policy, op)).await {
        Ok(result) => result,
        Err(_) => Err(RetryError::DeadlineExceeded),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug, Error)]
    #[error("flaky")]
    struct Flaky;

    fn quick() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = run(quick(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Flaky)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run(quick(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Flaky) }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn first_success_skips_backoff() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, RetryError<Flaky>> = run(quick(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cuts_off_retries() {
        let slow = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
        };
        let result: Result<(), _> = run_with_deadline(slow, Duration::from_secs(5), || async {
            Err(Flaky)
        })
        .await;

        assert!(matches!(result, Err(RetryError::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delay_doubles_up_to_cap() {
        // 3 failed attempts sleep base + 2*base = 300ms total with a 1s cap.
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        };
        let start = tokio::time::Instant::now();
        let _: Result<(), _> = run(policy, || async { Err(Flaky) }).await;
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }
}
