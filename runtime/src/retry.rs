//! Bounded retry for storage operations.

use std::time::Duration;

use tracing::warn;

use crate::store::StoreError;

/// How many times to attempt a storage operation, and how long to wait
/// between attempts.
///
/// Handlers take their policy at construction, so tests can run with
/// [`RetryPolicy::TESTING`] while production code keeps the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Default policy: up to 10 attempts, 500ms apart.
    pub const PRODUCTION: Self = Self {
        max_attempts: 10,
        delay: Duration::from_millis(500),
    };

    /// Single attempt, no delay.
    pub const TESTING: Self = Self {
        max_attempts: 1,
        delay: Duration::ZERO,
    };

    /// Runs `op` until it succeeds or the attempt budget is exhausted.
    ///
    /// Each failure is logged with the operation name and attempt number.
    /// Returns the last error when every attempt fails.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut last = None;
        for attempt in 1..=self.max_attempts.max(1) {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(
                        operation = what,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "storage operation failed"
                    );
                    last = Some(err);
                }
            }
            if attempt < self.max_attempts && !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
        }
        Err(last.unwrap_or_else(|| StoreError("no attempts were made".to_string())))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::PRODUCTION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeds_first_attempt() {
        let policy = RetryPolicy::TESTING;
        let result = policy.run("get", || Ok(42));
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn test_retries_until_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
        };
        let mut calls = 0;
        let result = policy.run("get", || {
            calls += 1;
            if calls < 3 {
                Err(StoreError("transient".to_string()))
            } else {
                Ok("done")
            }
        });
        assert_eq!(result, Ok("done"));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhaustion_returns_last_error() {
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::ZERO,
        };
        let mut calls = 0;
        let result: Result<(), _> = policy.run("set", || {
            calls += 1;
            Err(StoreError(format!("failure {calls}")))
        });
        assert_eq!(result, Err(StoreError("failure 2".to_string())));
        assert_eq!(calls, 2);
    }
}
