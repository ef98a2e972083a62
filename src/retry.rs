//! Bounded exponential backoff for rate-limited backend calls.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::{Error, Result};

/// How often, and how patiently, to retry a rate-limited call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Sleep before the second attempt; doubled before each further attempt.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Sleep before attempt `attempt + 1` (1-based `attempt`).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }
}

/// Outcome of one failed attempt.
#[derive(Debug)]
pub enum AttemptError {
    /// The backend is out of capacity right now; worth retrying.
    RateLimited(String),

    /// Anything else; surfaced immediately.
    Fatal(Error),
}

impl AttemptError {
    pub fn fatal(err: impl Into<Error>) -> Self {
        Self::Fatal(err.into())
    }
}

/// Run `op` until it succeeds, fails fatally, or `policy.max_attempts` rate-limited attempts
/// have been made (then [`Error::NoCapacity`]).
pub fn run_with_backoff<T>(
    policy: &RetryPolicy,
    mut op: impl FnMut() -> std::result::Result<T, AttemptError>,
) -> Result<T> {
    for attempt in 1..=policy.max_attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(AttemptError::Fatal(err)) => return Err(err),
            Err(AttemptError::RateLimited(detail)) => {
                if attempt == policy.max_attempts {
                    break;
                }

                let delay = policy.delay_after(attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    detail = %detail,
                    "rate limited, retrying"
                );
                thread::sleep(delay);
            }
        }
    }

    Err(Error::NoCapacity {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::ZERO,
        }
    }

    #[test]
    fn delays_double_from_the_initial_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(4), Duration::from_secs(8));
    }

    #[test]
    fn retries_rate_limits_until_success() -> anyhow::Result<()> {
        let mut calls = 0;
        let value = run_with_backoff(&instant(5), || {
            calls += 1;
            if calls < 3 {
                Err(AttemptError::RateLimited("429".to_owned()))
            } else {
                Ok("done")
            }
        })?;

        assert_eq!(value, "done");
        assert_eq!(calls, 3);
        Ok(())
    }

    #[test]
    fn exhausting_attempts_is_no_capacity() {
        let mut calls = 0;
        let err = run_with_backoff(&instant(4), || -> std::result::Result<(), _> {
            calls += 1;
            Err(AttemptError::RateLimited("429".to_owned()))
        })
        .unwrap_err();

        assert_eq!(calls, 4);
        assert!(matches!(err, Error::NoCapacity { attempts: 4 }));
    }

    #[test]
    fn fatal_errors_are_not_retried() {
        let mut calls = 0;
        let err = run_with_backoff(&instant(4), || -> std::result::Result<(), _> {
            calls += 1;
            Err(AttemptError::Fatal(Error::Backend {
                status: 500,
                body: "boom".to_owned(),
            }))
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, Error::Backend { status: 500, .. }));
    }

    #[test]
    fn zero_attempts_never_calls_op() {
        let mut called = false;
        let err = run_with_backoff(&instant(0), || -> std::result::Result<(), AttemptError> {
            called = true;
            Ok(())
        })
        .unwrap_err();

        assert!(!called);
        assert!(err.is_no_capacity());
    }
}
