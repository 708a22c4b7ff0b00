//! Retry driver with linear backoff.
//!
//! Every directory fetch and file transfer runs under the same [`RetryPolicy`]:
//! up to five attempts, waiting `i` backoff units after failed attempt `i`,
//! and stopping on the first outcome that is not [`ResultStatus::Retry`].
//!
//! ```text
//! attempt 1 -> 5s -> attempt 2 -> 10s -> attempt 3 -> 15s -> attempt 4 -> 20s -> attempt 5
//! ```
//!
//! The module also owns the mapping from HTTP failures to [`ResultStatus`].

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use super::constants::{BACKOFF_UNIT, MAX_ATTEMPTS};
use super::error::MirrorError;
use super::status::{Attempt, ResultStatus};

/// Linear backoff policy with a fixed attempt ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    max_attempts: u32,
    /// Wait after failed attempt `i` is `i * backoff_unit`.
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            backoff_unit: BACKOFF_UNIT,
        }
    }
}

/// Final outcome of a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retried<T> {
    /// Outcome of the last attempt made.
    pub outcome: T,
    /// Number of attempts made (at least 1).
    pub attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    /// Returns the attempt ceiling.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff unit.
    #[must_use]
    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Wait before the attempt following failed attempt `attempt` (1-indexed).
    ///
    /// Returns `None` after the last attempt.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then(|| self.backoff_unit * attempt)
    }

    /// Runs `operation` until it returns something other than `Retry` or the
    /// attempt budget is spent.
    ///
    /// After exhaustion the last `Retry` outcome is returned as final.
    ///
    /// # Errors
    ///
    /// A fatal [`MirrorError`] from any attempt is returned immediately.
    #[instrument(skip(self, operation), fields(max_attempts = self.max_attempts))]
    pub async fn run<T, F, Fut>(&self, url: &str, mut operation: F) -> Result<Retried<T>, MirrorError>
    where
        T: Attempt,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MirrorError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(attempt, "attempting");
            let outcome = operation().await?;

            if !outcome.status().is_retry() {
                return Ok(Retried {
                    outcome,
                    attempts: attempt,
                });
            }

            let Some(delay) = self.delay_after(attempt) else {
                warn!(attempts = attempt, "retry budget exhausted, giving up");
                return Ok(Retried {
                    outcome,
                    attempts: attempt,
                });
            };

            warn!(
                attempt,
                next_attempt = attempt + 1,
                delay_secs = delay.as_secs_f64(),
                "transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Maps a non-success HTTP status to its outcome: server errors are transient.
#[must_use]
pub fn status_for_http(status: StatusCode) -> ResultStatus {
    if status.is_server_error() {
        ResultStatus::Retry
    } else {
        ResultStatus::Error
    }
}

/// Maps a failed request to its outcome.
///
/// Requests that could not even be built (for example an unparsable child
/// URL) will never succeed; everything else is a connection-level failure.
#[must_use]
pub fn status_for_transport(error: &reqwest::Error) -> ResultStatus {
    if error.is_builder() {
        ResultStatus::Error
    } else {
        ResultStatus::Retry
    }
}
