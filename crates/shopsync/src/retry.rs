//! Retry Guard
//!
//! Re-runs an operation from scratch when it fails because an element went
//! stale between resolution and use. Only `StaleReference` is transient;
//! every other error propagates on the first attempt.

use crate::result::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::warn;

/// Default attempt budget
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Attempt budget for a guarded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first (0 is treated as 1)
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Attempts actually made available
    #[must_use]
    pub const fn budget(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Run `operation` under this policy
    ///
    /// # Errors
    ///
    /// See [`with_retry`].
    pub fn run<T, F>(&self, operation: F) -> SyncResult<T>
    where
        F: FnMut() -> SyncResult<T>,
    {
        with_retry(self.max_attempts, operation)
    }
}

/// Result of a successful guarded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryReport {
    /// Number of attempts before success
    pub attempts: u32,
    /// Total duration of all attempts
    pub duration: Duration,
}

/// Run `operation`, re-invoking it on `StaleReference` up to `max_attempts` times.
///
/// # Errors
///
/// `RetryExhausted` wrapping the last stale error when every attempt went
/// stale; any other error from the operation unchanged.
pub fn with_retry<T, F>(max_attempts: u32, operation: F) -> SyncResult<T>
where
    F: FnMut() -> SyncResult<T>,
{
    with_retry_report(max_attempts, operation).map(|(value, _)| value)
}

/// Like [`with_retry`], also reporting how many attempts it took
///
/// # Errors
///
/// See [`with_retry`].
pub fn with_retry_report<T, F>(max_attempts: u32, mut operation: F) -> SyncResult<(T, RetryReport)>
where
    F: FnMut() -> SyncResult<T>,
{
    let budget = RetryPolicy::new(max_attempts).budget();
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match operation() {
            Ok(value) => {
                return Ok((
                    value,
                    RetryReport {
                        attempts,
                        duration: start.elapsed(),
                    },
                ));
            }
            Err(e) if e.is_stale() => {
                if attempts >= budget {
                    return Err(SyncError::RetryExhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
                warn!(attempt = attempts, of = budget, cause = %e, "stale element, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::result::ErrorKind;
    use proptest::prelude::*;

    fn flaky(stale_first: u32) -> impl FnMut() -> SyncResult<&'static str> {
        let mut calls = 0;
        move || {
            calls += 1;
            if calls <= stale_first {
                Err(SyncError::stale("product grid"))
            } else {
                Ok("done")
            }
        }
    }

    #[test]
    fn test_first_attempt_success() {
        let (value, report) = with_retry_report(3, flaky(0)).unwrap();
        assert_eq!(value, "done");
        assert_eq!(report.attempts, 1);
    }

    #[test]
    fn test_recovers_after_stale() {
        let (_, report) = with_retry_report(3, flaky(2)).unwrap();
        assert_eq!(report.attempts, 3);
    }

    #[test]
    fn test_exhausted_wraps_last_error() {
        let err = with_retry(3, flaky(3)).unwrap_err();
        match err {
            SyncError::RetryExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.kind(), ErrorKind::StaleReference);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_stale_error_is_not_retried() {
        let mut calls = 0;
        let err = with_retry(5, || -> SyncResult<()> {
            calls += 1;
            Err(SyncError::not_found("delete item button"))
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(err.kind(), ErrorKind::ElementNotFound);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let mut calls = 0;
        let err = with_retry(0, || -> SyncResult<()> {
            calls += 1;
            Err(SyncError::stale("x"))
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, SyncError::RetryExhausted { attempts: 1, .. }));
    }

    #[test]
    fn test_policy_runs_operation() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.budget(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(policy.run(flaky(1)).unwrap(), "done");
    }

    mod property_tests {
        use super::*;

        proptest! {
            #[test]
            fn prop_attempts_follow_stale_count(stale in 0u32..8, max in 1u32..8) {
                let result = with_retry_report(max, flaky(stale));
                if stale < max {
                    let (_, report) = result.unwrap();
                    prop_assert_eq!(report.attempts, stale + 1);
                } else {
                    let exhausted = matches!(
                        result,
                        Err(SyncError::RetryExhausted { attempts, .. }) if attempts == max
                    );
                    prop_assert!(exhausted);
                }
            }
        }
    }
}
