//! Polling and retry helpers for eventually-consistent remote APIs
//!
//! Both helpers share the same deadline rule: work continues until the
//! caller's timeout elapses, then exactly one more attempt is made before the
//! outcome is reported.

use crate::error::{CloudError, Result};
use crate::provider::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Fixed-interval polling configuration
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    /// Delay between two status checks
    pub interval: Duration,

    /// Overall time budget
    pub timeout: Duration,
}

impl WaitConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Outcome of a single status check
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus<T> {
    /// Still transitioning; carries the observed status for logs and timeouts
    Pending(String),
    /// Reached a terminal success status
    Ready(T),
    /// Reached a terminal failure status
    Failed(String),
}

/// Poll `check` until it reports a terminal status or the timeout elapses.
///
/// Errors returned by `check` abort the wait immediately.
pub async fn wait_until<T, F, Fut>(resource: &str, config: &WaitConfig, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus<T>>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        match check().await? {
            PollStatus::Ready(value) => {
                tracing::debug!("{} ready after {} checks", resource, polls);
                return Ok(value);
            }
            PollStatus::Failed(reason) => {
                return Err(CloudError::UnexpectedState {
                    resource: resource.to_string(),
                    reason,
                });
            }
            PollStatus::Pending(status) => {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                tracing::debug!("{} is {}, checking again", resource, status);
                sleep(config.interval.min(deadline - now)).await;
                if Instant::now() >= deadline {
                    break;
                }
            }
        }
    }

    tracing::debug!("{} wait timed out, final status check", resource);
    match check().await? {
        PollStatus::Ready(value) => Ok(value),
        PollStatus::Failed(reason) => Err(CloudError::UnexpectedState {
            resource: resource.to_string(),
            reason,
        }),
        PollStatus::Pending(last_status) => Err(CloudError::Timeout {
            resource: resource.to_string(),
            last_status,
        }),
    }
}

/// Call `op` until it succeeds, fails with a non-retryable error, or the
/// timeout elapses.
///
/// Retryable errors back off per `config` without sleeping past the deadline.
/// Once the deadline has passed, `op` runs one final time and its result is
/// returned unchanged.
pub async fn retry_until<T, E, F, Fut, P>(
    operation: &str,
    config: &RetryConfig,
    timeout: Duration,
    is_retryable: P,
    mut op: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let deadline = Instant::now() + timeout;
    let mut attempt: u32 = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) => {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let delay = config.delay_for_attempt(attempt).min(deadline - now);
                tracing::debug!(
                    "{} failed with retryable error (attempt {}), retrying in {:?}: {}",
                    operation,
                    attempt + 1,
                    delay,
                    e
                );
                sleep(delay).await;
                attempt += 1;
                if Instant::now() >= deadline {
                    break;
                }
            }
            Err(e) => return Err(e),
        }
    }

    tracing::warn!(
        "{} still failing after {:?}, making a final attempt",
        operation,
        timeout
    );
    op().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_when_ready() {
        let calls = counter();
        let config = WaitConfig::new(Duration::from_secs(10), Duration::from_secs(300));

        let c = calls.clone();
        let value = wait_until("fleet-1", &config, move || {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Ok(PollStatus::Pending("ACTIVATING".to_string()))
                } else {
                    Ok(PollStatus::Ready("ACTIVE"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, "ACTIVE");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_failure_status() {
        let config = WaitConfig::new(Duration::from_secs(10), Duration::from_secs(300));
        let err = wait_until::<(), _, _>("fleet-1", &config, || async {
            Ok(PollStatus::Failed("ERROR".to_string()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CloudError::UnexpectedState { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_makes_one_final_check() {
        let calls = counter();
        let config = WaitConfig::new(Duration::from_secs(10), Duration::from_secs(30));
        let started = Instant::now();

        let c = calls.clone();
        let err = wait_until::<(), _, _>("fleet-1", &config, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(PollStatus::Pending("DELETING".to_string()))
            }
        })
        .await
        .unwrap_err();

        // t=0, t=10, t=20 inside the window, then one check at the deadline
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        match err {
            CloudError::Timeout { last_status, .. } => assert_eq!(last_status, "DELETING"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_final_check_can_succeed() {
        let calls = counter();
        let config = WaitConfig::new(Duration::from_secs(10), Duration::from_secs(20));

        let c = calls.clone();
        let value = wait_until("fleet-1", &config, move || {
            let c = c.clone();
            async move {
                // checks at t=0 and t=10 pending, final check at t=20 ready
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Ok(PollStatus::Pending("ACTIVATING".to_string()))
                } else {
                    Ok(PollStatus::Ready(42))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_check_error_propagates() {
        let config = WaitConfig::new(Duration::from_secs(10), Duration::from_secs(30));
        let err = wait_until::<(), _, _>("fleet-1", &config, || async {
            Err(CloudError::ApiError("boom".to_string()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CloudError::ApiError(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let calls = counter();
        let c = calls.clone();

        let result: std::result::Result<u32, String> = retry_until(
            "CreateFleet",
            &RetryConfig::default(),
            Duration::from_secs(120),
            |e: &String| e.contains("not authorized"),
            move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    if n < 3 {
                        Err("GameLift is not authorized to perform".to_string())
                    } else {
                        Ok(n)
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_non_retryable_returns_immediately() {
        let calls = counter();
        let c = calls.clone();

        let result: std::result::Result<(), String> = retry_until(
            "CreateFleet",
            &RetryConfig::default(),
            Duration::from_secs(120),
            |e: &String| e.contains("not authorized"),
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("LimitExceededException".to_string())
                }
            },
        )
        .await;

        assert_eq!(result, Err("LimitExceededException".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_is_bounded_by_timeout() {
        let calls = counter();
        let c = calls.clone();
        let started = Instant::now();

        let config = RetryConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        };

        let result: std::result::Result<(), String> = retry_until(
            "CreateFleet",
            &config,
            Duration::from_secs(120),
            |_| true,
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("GameLift is not authorized to perform".to_string())
                }
            },
        )
        .await;

        assert!(result.is_err());
        // never sleeps past the deadline
        assert_eq!(started.elapsed(), Duration::from_secs(120));
        // delays 1+2+4+8+16+30+30+29 (clamped) then the final attempt
        assert_eq!(calls.load(Ordering::SeqCst), 9);
    }
}
