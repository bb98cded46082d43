//! Diagnostic sinks for retry attempts.
//!
//! The fetcher reports every failed attempt to a [`RetryObserver`] before it
//! backs off or gives up. Observers only watch; they cannot change the
//! outcome of a call.

use crate::FailedAttempt;

pub trait RetryObserver: Send + Sync {
    /// Called once per failed attempt, including the final one.
    fn attempt_failed(&self, event: &FailedAttempt<'_>);

    /// Called when an attempt after the first one succeeds.
    fn attempt_succeeded(&self, _attempt: usize, _max_attempts: usize) {}
}

impl<F> RetryObserver for F
where
    F: Fn(&FailedAttempt<'_>) + Send + Sync,
{
    fn attempt_failed(&self, event: &FailedAttempt<'_>) {
        self(event)
    }
}

/// Discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl RetryObserver for NoopObserver {
    fn attempt_failed(&self, _event: &FailedAttempt<'_>) {}
}

/// Emits events through `tracing`.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

#[cfg(feature = "tracing")]
impl RetryObserver for TracingObserver {
    fn attempt_failed(&self, event: &FailedAttempt<'_>) {
        match event.next_delay {
            Some(delay) => tracing::warn!(
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                kind = %event.failure.kind,
                error = %event.failure.message,
                next_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "fetch attempt failed, retrying"
            ),
            None => tracing::warn!(
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                kind = %event.failure.kind,
                error = %event.failure.message,
                "fetch attempt failed, giving up"
            ),
        }
    }

    fn attempt_succeeded(&self, attempt: usize, max_attempts: usize) {
        tracing::info!(attempt, max_attempts, "fetch recovered after retry");
    }
}
