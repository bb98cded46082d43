use std::fmt;
use std::sync::Arc;

use tokio::time::{sleep, timeout};

use crate::{
    AttemptFailure, FailedAttempt, FetchError, ReqwestTransport, RequestSpec, Result,
    RetryObserver, RetryPolicy, Transport,
};

#[derive(Clone)]
/// Sends requests through a [`Transport`], retrying transport failures with
/// exponential backoff.
///
/// Attempts run strictly one after another. Each attempt gets its own timeout
/// that lives exactly as long as the attempt. Dropping the future returned by
/// [`RetryingFetcher::execute`] cancels the in-flight attempt or pending backoff
/// along with its timer.
pub struct RetryingFetcher<T = ReqwestTransport> {
    transport: T,
    policy: RetryPolicy,
    observer: Arc<dyn RetryObserver>,
}

impl<T: fmt::Debug> fmt::Debug for RetryingFetcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingFetcher")
            .field("transport", &self.transport)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryingFetcher<ReqwestTransport> {
    /// Creates a reqwest-backed fetcher with the default policy.
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }

    /// Creates a reqwest-backed fetcher whose policy comes from
    /// `RETRY_FETCH_MAX_ATTEMPTS` / `RETRY_FETCH_BASE_DELAY_MS`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use retry_fetch::RetryingFetcher;
    ///
    /// let fetcher = RetryingFetcher::from_env().expect("invalid RETRY_FETCH_* env vars");
    /// ```
    pub fn from_env() -> Result<Self> {
        Ok(Self::new().with_policy(RetryPolicy::from_env()?))
    }
}

impl Default for RetryingFetcher<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> RetryingFetcher<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            observer: default_observer(),
        }
    }

    /// Applies the retry policy used by [`RetryingFetcher::execute`].
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the diagnostic sink that receives failed attempts.
    pub fn with_observer(mut self, observer: impl RetryObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `request` using the fetcher's policy.
    pub async fn execute(&self, request: &RequestSpec) -> Result<T::Response> {
        self.execute_with(request, &self.policy).await
    }

    /// Sends `request`, retrying transport failures according to `policy`.
    ///
    /// Returns the first response obtained, whatever its HTTP status. When all
    /// attempts fail, returns [`FetchError::RetryExhausted`] wrapping the last
    /// failure. Malformed input fails before any attempt is made.
    pub async fn execute_with(
        &self,
        request: &RequestSpec,
        policy: &RetryPolicy,
    ) -> Result<T::Response> {
        request.validate()?;
        policy.validate()?;

        let max_attempts = policy.max_attempts;
        let mut attempt = 1usize;
        loop {
            let failure = match self.attempt(request).await {
                Ok(response) => {
                    if attempt > 1 {
                        self.observer.attempt_succeeded(attempt, max_attempts);
                    }
                    return Ok(response);
                }
                Err(failure) => failure,
            };

            let next_delay = (attempt < max_attempts).then(|| policy.delay_after(attempt));
            self.observer.attempt_failed(&FailedAttempt {
                attempt,
                max_attempts,
                failure: &failure,
                next_delay,
            });

            let Some(delay) = next_delay else {
                return Err(FetchError::RetryExhausted {
                    attempts: attempt,
                    last: failure,
                });
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "retrying {} {} after {} ms",
                request.method(),
                request.url(),
                delay.as_millis()
            );

            sleep(delay).await;
            attempt += 1;
        }
    }

    /// Runs one attempt under its own timeout. The timer is dropped together
    /// with the attempt future, so it cannot fire into a later attempt.
    async fn attempt(
        &self,
        request: &RequestSpec,
    ) -> std::result::Result<T::Response, AttemptFailure> {
        let limit = request.timeout();
        match timeout(limit, self.transport.send(request)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => Err(AttemptFailure::timed_out(limit)),
        }
    }
}

#[cfg(feature = "tracing")]
fn default_observer() -> Arc<dyn RetryObserver> {
    Arc::new(crate::TracingObserver)
}

#[cfg(not(feature = "tracing"))]
fn default_observer() -> Arc<dyn RetryObserver> {
    Arc::new(crate::NoopObserver)
}
