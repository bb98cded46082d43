use std::{fmt, time::Duration};

/// Classification of a failed attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FailureKind {
    /// The attempt exceeded its per-attempt timeout and was cancelled.
    Timeout,
    /// Connection-level failure: DNS, refused, reset.
    Network,
    /// The exchange was cut short after it started.
    Aborted,
}

impl FailureKind {
    /// Timeouts are delivered by cancelling the attempt, so they count as aborts.
    pub fn is_abort(self) -> bool {
        matches!(self, Self::Timeout | Self::Aborted)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure of one attempt.
///
/// A response with an unsuccessful HTTP status is not a failure; only errors
/// below the application protocol end up here.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Network, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Aborted, message)
    }

    pub fn timed_out(after: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("attempt timed out after {} ms", after.as_millis()),
        )
    }
}

/// Diagnostic record for a failed attempt.
#[derive(Clone, Copy, Debug)]
pub struct FailedAttempt<'a> {
    /// 1-based attempt number.
    pub attempt: usize,
    pub max_attempts: usize,
    pub failure: &'a AttemptFailure,
    /// Backoff before the next attempt; `None` when this was the last one.
    pub next_delay: Option<Duration>,
}

impl FailedAttempt<'_> {
    pub fn is_final(&self) -> bool {
        self.next_delay.is_none()
    }
}
