//! Caller-side retry for opening connections.
//!
//! [`ConnectionConfig::open_connection`](crate::config::ConnectionConfig::open_connection)
//! makes one attempt per call; a caller that wants more wraps the call in
//! [`RetryPolicy::run`].

use crate::error::ConnectionError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Whether a failed connection attempt is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

#[derive(Debug, Error)]
pub enum RetryError {
    /// Retrying cannot help, e.g. the driver is unknown.
    #[error(transparent)]
    Fatal(ConnectionError),

    #[error("Giving up after {attempts} attempts: {source}")]
    AttemptsExceeded {
        attempts: usize,
        #[source]
        source: ConnectionError,
    },
}

impl RetryError {
    pub fn into_inner(self) -> ConnectionError {
        match self {
            RetryError::Fatal(err) | RetryError::AttemptsExceeded { source: err, .. } => err,
        }
    }
}

/// Repeats refused connection attempts with exponential backoff. Errors whose
/// [`ConnectionError::disposition`] is `Stop` end the run at once.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// `attempts` is clamped to at least one. A zero `max_delay` caps the
    /// backoff at `base_delay`.
    pub fn new(attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            max_delay: if max_delay.is_zero() {
                base_delay
            } else {
                max_delay
            },
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub async fn run<F, Fut, T>(&self, mut open: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ConnectionError>>,
    {
        let mut attempt = 1;
        loop {
            let err = match open().await {
                Ok(conn) => return Ok(conn),
                Err(err) => err,
            };

            if err.disposition() == RetryDisposition::Stop {
                return Err(RetryError::Fatal(err));
            }
            if attempt >= self.attempts {
                return Err(RetryError::AttemptsExceeded {
                    attempts: attempt,
                    source: err,
                });
            }

            let delay = self.backoff_delay(attempt);
            warn!(
                attempt,
                attempts = self.attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Connection attempt failed, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Delay after the `attempt`-th failure (1-based): `base_delay` doubled per
    /// earlier failure, capped at `max_delay`.
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(1 << doublings)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn refused() -> ConnectionError {
        ConnectionError::Connect {
            url: "mysql://localhost/db".to_string(),
            source: DriverError::Unexpected("connection refused".to_string()),
        }
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(40), Duration::from_millis(500));
    }

    #[test]
    fn test_new_clamps_attempts_and_cap() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10), Duration::ZERO);
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_refused_attempts_are_retried_until_success() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(3, Duration::ZERO, Duration::ZERO);

        let result = policy
            .run(move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(refused()) } else { Ok(n) }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_driver_load_failure_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(5, Duration::ZERO, Duration::ZERO);

        let result: Result<(), _> = policy
            .run(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ConnectionError::DriverLoad {
                    driver: "org.example.Missing".to_string(),
                    reason: "no driver registered under this name".to_string(),
                })
            })
            .await;

        assert!(matches!(
            result,
            Err(RetryError::Fatal(ConnectionError::DriverLoad { .. }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_configured_attempts() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(2, Duration::ZERO, Duration::ZERO);

        let err = policy
            .run(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(refused())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::AttemptsExceeded { attempts: 2, .. }));
        assert!(err.to_string().starts_with("Giving up after 2 attempts"));
        assert!(matches!(err.into_inner(), ConnectionError::Connect { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
