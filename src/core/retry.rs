//! Retry policy for the data-fetch boundary.
//!
//! One policy is applied to every boundary read instead of ad hoc loops at each
//! call site: transient failures are retried with exponentially growing delays
//! until the attempt budget runs out, permanent failures are returned at once.

use crate::errors::{Error, Result};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder, future::retry_notify};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How failed fetches are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Randomization factor in `[0, 1]`; 0 gives fixed delays
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// The delay schedule; attempts are bounded separately by `max_attempts`.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(self.jitter)
            .with_max_elapsed_time(None)
            .build()
    }
}

fn retry_notify_handler(err: Error, duration: Duration) {
    warn!(
        "Fetch failed: {}. Retrying in {:.1}s...",
        err,
        duration.as_secs_f32()
    );
}

/// Runs `operation` under `policy`.
///
/// The operation is re-run while it fails with a transient error
/// ([`Error::is_transient`]) and attempts remain. The last error is returned once
/// the budget is spent; permanent errors are returned immediately.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    retry_notify(
        policy.backoff(),
        || {
            attempt += 1;
            let current = attempt;
            let fut = operation();
            async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(err) if err.is_transient() && current < max_attempts => {
                        Err(backoff::Error::transient(err))
                    }
                    Err(err) => Err(backoff::Error::permanent(err)),
                }
            }
        },
        retry_notify_handler,
    )
    .await
}
