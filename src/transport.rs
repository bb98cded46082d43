use std::future::Future;

use crate::{AttemptFailure, RequestSpec};

/// Performs a single attempt of a request.
///
/// Implementations report only transport-level problems as errors; any
/// response the server produced, whatever its status, is a success. The
/// fetcher cancels an attempt by dropping the returned future.
pub trait Transport {
    type Response: Send;

    fn send(
        &self,
        request: &RequestSpec,
    ) -> impl Future<Output = Result<Self::Response, AttemptFailure>> + Send;
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn build(&self, request: &RequestSpec) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(request.method().clone(), request.url())
            .headers(request.headers().clone());
        match request.body_bytes() {
            Some(body) => builder.body(body.to_vec()),
            None => builder,
        }
    }
}

impl Transport for ReqwestTransport {
    type Response = reqwest::Response;

    fn send(
        &self,
        request: &RequestSpec,
    ) -> impl Future<Output = Result<Self::Response, AttemptFailure>> + Send {
        let builder = self.build(request);
        async move { builder.send().await.map_err(classify_transport_error) }
    }
}

fn classify_transport_error(err: reqwest::Error) -> AttemptFailure {
    let message = err.to_string();
    if err.is_timeout() {
        AttemptFailure::new(crate::FailureKind::Timeout, message)
    } else if err.is_connect() || err.is_request() || err.is_builder() {
        AttemptFailure::network(message)
    } else {
        AttemptFailure::aborted(message)
    }
}
