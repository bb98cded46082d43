use std::time::Duration;

use serde::Deserialize;

use crate::{FetchError, Result};

const ENV_MAX_ATTEMPTS: &str = "RETRY_FETCH_MAX_ATTEMPTS";
const ENV_BASE_DELAY_MS: &str = "RETRY_FETCH_BASE_DELAY_MS";

/// Configures how many attempts are made and how long to back off between them.
///
/// The delay after failed attempt `n` is `base_delay_ms * 2^(n-1)`; no delay
/// follows the final attempt.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Must be at least 1.
    pub max_attempts: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::new(1, 0)
    }

    /// Reads the policy from environment variables.
    ///
    /// Reads:
    /// - `RETRY_FETCH_MAX_ATTEMPTS`: total attempts
    /// - `RETRY_FETCH_BASE_DELAY_MS`: base backoff in milliseconds
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = Self::default();
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            policy.max_attempts = parse_var(ENV_MAX_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BASE_DELAY_MS) {
            policy.base_delay_ms = parse_var(ENV_BASE_DELAY_MS, &raw)?;
        }
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(FetchError::InvalidPolicy(
                "max_attempts must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Backoff to wait after the given (1-based) attempt has failed.
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let exp = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let delay_ms = 2u64
            .checked_pow(exp)
            .map_or(u64::MAX, |multiplier| {
                self.base_delay_ms.saturating_mul(multiplier)
            });
        Duration::from_millis(delay_ms)
    }

    /// Sum of all backoff delays when every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.delay_after(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| FetchError::Config(format!("{key} is not a valid number: '{raw}'")))
}
