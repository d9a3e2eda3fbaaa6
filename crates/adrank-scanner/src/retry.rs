//! Retry policy for a single city.

use crate::error::AttemptError;
use crate::outcome::AttemptOutcome;
use adrank_core::City;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Base delay for retry backoff; attempt `n` waits `n` times this.
pub const RETRY_BACKOFF_STEP: Duration = Duration::from_secs(5);

/// One fetch-and-extract attempt that can be repeated.
#[async_trait]
pub trait Attempt: Send {
    /// Run attempt number `index` (0 for the first try).
    async fn attempt(&mut self, index: u32) -> AttemptOutcome;
}

/// Bounded retry with linear backoff.
///
/// Only blocked or timed-out attempts are retried; every other failure is
/// final on first occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_step: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_step: RETRY_BACKOFF_STEP,
        }
    }

    /// Delay before attempt `index`.
    #[must_use]
    pub fn backoff(&self, index: u32) -> Duration {
        self.backoff_step * index
    }

    /// Run `op` until it succeeds, fails terminally, or retries run out.
    ///
    /// Returns the last attempt's outcome unchanged. Cancellation during a
    /// backoff returns the previous outcome; during an attempt it yields
    /// [`AttemptError::Cancelled`].
    pub async fn run(
        &self,
        city: &City,
        cancel: &CancellationToken,
        op: &mut dyn Attempt,
    ) -> AttemptOutcome {
        let mut index = 0;
        loop {
            let outcome = tokio::select! {
                outcome = op.attempt(index) => outcome,
                () = cancel.cancelled() => AttemptOutcome::failure(AttemptError::Cancelled, false),
            };

            if !outcome.is_retryable() || index >= self.max_retries {
                return outcome;
            }

            tracing::warn!(
                city = %city,
                attempt = index,
                error = ?outcome.error,
                blocked = outcome.blocked,
                "Attempt failed"
            );

            index += 1;
            let delay = self.backoff(index);
            tracing::info!(city = %city, "Retry {} in {:?}", index, delay);

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => return outcome,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}
