use crate::AttemptFailure;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent as described; no attempt was made.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The retry policy cannot be honoured; no attempt was made.
    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),
    /// A configuration value could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
    /// Every permitted attempt failed.
    #[error("request failed after {attempts} attempt(s): {last}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Failure reported by the final attempt.
        #[source]
        last: AttemptFailure,
    },
}

impl FetchError {
    /// Returns the final attempt's failure when attempts were exhausted.
    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        match self {
            Self::RetryExhausted { last, .. } => Some(last),
            _ => None,
        }
    }

    /// True when the final attempt ran out of time.
    pub fn is_timeout(&self) -> bool {
        self.last_failure()
            .is_some_and(|failure| failure.kind == crate::FailureKind::Timeout)
    }
}
