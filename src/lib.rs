//! `retry-fetch` sends HTTP requests with bounded, exponential-backoff retries.
//!
//! - [`RetryingFetcher::execute`] runs a [`RequestSpec`] under the fetcher's
//!   [`RetryPolicy`]
//! - [`RetryingFetcher::execute_with`] runs it under an explicit policy
//!
//! Only transport failures (connection errors, aborts, per-attempt timeouts)
//! are retried. Responses with unsuccessful status codes are returned as-is.

mod client;
mod error;
mod observer;
mod options;
mod request;
mod transport;
mod types;

pub use client::RetryingFetcher;
pub use error::FetchError;
#[cfg(feature = "tracing")]
pub use observer::TracingObserver;
pub use observer::{NoopObserver, RetryObserver};
pub use options::RetryPolicy;
pub use request::{RequestSpec, DEFAULT_TIMEOUT_MS};
pub use transport::{ReqwestTransport, Transport};
pub use types::{AttemptFailure, FailedAttempt, FailureKind};

pub use reqwest::Method;

pub type Result<T> = std::result::Result<T, FetchError>;
