// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Retry loop with capped exponential backoff and cancellation.
//!
//! Each attempt is an independent future that either succeeds or reports an
//! [`AttemptError`] saying whether the failure is worth retrying. The loop owns
//! the only mutable state (the attempt counter), so no response or error is
//! shared between attempts.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of a failed attempt.
#[derive(Debug)]
pub struct AttemptError {
    pub error: Error,
    pub retryable: bool,
}

impl AttemptError {
    pub fn retryable(error: Error) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    pub fn fatal(error: Error) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

impl From<Error> for AttemptError {
    /// Classify by the error itself.
    fn from(error: Error) -> Self {
        let retryable = error.is_retryable();
        Self { error, retryable }
    }
}

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry (doubles each retry).
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `attempt` until it succeeds, fails fatally, or retries run out.
    ///
    /// The closure receives the 1-based attempt number. Cancellation aborts both
    /// an in-flight attempt and a pending backoff sleep with [`Error::Cancelled`].
    pub async fn run<T, F, Fut>(
        &self,
        op: &'static str,
        path: &str,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        let cancelled = || Error::Cancelled {
            op,
            path: path.to_string(),
        };
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                outcome = attempt(attempts) => outcome,
            };

            let failure = match outcome {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if !failure.retryable || attempts > self.max_retries {
                return Err(failure.error);
            }

            let delay = self.backoff(attempts);
            warn!(
                "{} {} failed (attempt {}/{}): {}, retrying in {:?}",
                op,
                path,
                attempts,
                self.max_retries + 1,
                failure.error,
                delay
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
            debug!("{} {}: starting attempt {}", op, path, attempts + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn status_error(status: u16, attempts: u32) -> Error {
        Error::HttpStatus {
            op: "test",
            path: "/shares".to_string(),
            status,
            attempts,
            body: String::new(),
        }
    }

    /// Simulated server: answers `statuses` in order, then 200.
    async fn run_against(policy: RetryPolicy, statuses: Vec<u16>) -> (Result<u32>, u32) {
        let calls = Arc::new(AtomicU32::new(0));
        let statuses = Arc::new(statuses);
        let token = CancellationToken::new();
        let result = policy
            .run("test", "/shares", &token, |attempt| {
                let calls = Arc::clone(&calls);
                let statuses = Arc::clone(&statuses);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) as usize;
                    match statuses.get(n) {
                        Some(&status) => Err(AttemptError::from(status_error(status, attempt))),
                        None => Ok(attempt),
                    }
                }
            })
            .await;
        (result, calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_retries_429_until_success() {
        let (result, calls) = run_against(fast_policy(5), vec![429, 429, 429]).await;
        assert_eq!(result.unwrap(), 4);
        // 3 retries after the first attempt.
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn test_retries_capped_by_max_retries() {
        let (result, calls) = run_against(fast_policy(2), vec![429, 429, 429]).await;
        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_404() {
        let (result, calls) = run_against(fast_policy(5), vec![404]).await;
        assert_eq!(result.unwrap_err().status(), Some(404));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_retries_5xx() {
        let (result, calls) = run_against(fast_policy(3), vec![500, 502, 503]).await;
        assert!(result.is_ok());
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn test_zero_retries() {
        let (result, calls) = run_against(RetryPolicy::none(), vec![503]).await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_fatal_attempt_error_not_retried() {
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast_policy(5)
            .run("test", "/x", &token, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::fatal(status_error(503, 1))) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast_policy(5)
            .run("test", "/x", &token, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_during_backoff() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(60),
        };
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result: Result<()> = tokio::time::timeout(
            Duration::from_secs(5),
            policy.run("test", "/x", &token, |attempt| async move {
                Err(AttemptError::from(status_error(503, attempt)))
            }),
        )
        .await
        .expect("cancellation should interrupt the backoff sleep");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_backoff_is_capped_exponential() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(800));
        assert_eq!(policy.backoff(5), Duration::from_millis(1000));
        assert_eq!(policy.backoff(40), Duration::from_millis(1000));

        let mut previous = Duration::ZERO;
        for attempt in 1..20 {
            let delay = policy.backoff(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
    }
}
