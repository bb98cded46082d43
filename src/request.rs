use std::time::Duration;

use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method, Url,
};
use serde::Serialize;

use crate::{FetchError, Result};

/// Default per-attempt timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Describes one logical request; every attempt sends it unchanged.
///
/// Builder methods never panic. The first malformed header or body is
/// remembered and reported by [`RequestSpec::validate`], so a broken request
/// fails before any attempt is made.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    url: String,
    method: Method,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout_ms: u64,
    invalid: Option<String>,
}

impl RequestSpec {
    /// Creates a `GET` request with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            invalid: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).with_method(Method::POST)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a header. Invalid names or values are reported by `validate`.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            self.record_invalid(format!("invalid header name '{name}'"));
            return self;
        };
        match HeaderValue::from_str(value.as_ref()) {
            Ok(header_value) => {
                self.headers.append(header_name, header_value);
            }
            Err(_) => self.record_invalid(format!("invalid value for header '{name}'")),
        }
        self
    }

    /// Sets `Authorization: Bearer <token>`, keeping an existing prefix.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        let value = normalize_bearer_authorization(token.as_ref());
        self.header(header::AUTHORIZATION, value)
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn text(self, body: impl Into<String>) -> Self {
        let body: String = body.into();
        self.header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
    }

    /// Serializes `value` as the JSON body and sets the content type.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                self.body = Some(body);
            }
            Err(err) => self.record_invalid(format!("body is not serializable as JSON: {err}")),
        }
        self
    }

    /// Per-attempt timeout in milliseconds.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn url(&self) -> &str {
        self.url.trim()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Checks the request before any attempt is made.
    pub fn validate(&self) -> Result<()> {
        if let Some(reason) = &self.invalid {
            return Err(FetchError::InvalidRequest(reason.clone()));
        }
        let url = self.url();
        if url.is_empty() {
            return Err(FetchError::InvalidRequest("url must not be empty".to_owned()));
        }
        let parsed = Url::parse(url)
            .map_err(|err| FetchError::InvalidRequest(format!("invalid url '{url}': {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidRequest(format!(
                "unsupported url scheme '{}' in '{url}'",
                parsed.scheme()
            )));
        }
        if !parsed.has_host() {
            return Err(FetchError::InvalidRequest(format!("url '{url}' has no host")));
        }
        if self.timeout_ms == 0 {
            return Err(FetchError::InvalidRequest(
                "timeout_ms must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    fn record_invalid(&mut self, reason: String) {
        if self.invalid.is_none() {
            self.invalid = Some(reason);
        }
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
