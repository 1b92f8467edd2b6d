//! Per-request options

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// How a single call through [`ApiClient`](super::ApiClient) is made
///
/// Defaults to an authenticated `GET` with no body, the client's default
/// timeout and no cancellation.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    /// Extra headers; these override the defaults except `Authorization`,
    /// which is replaced whenever a usable token is attached
    pub headers: Vec<(String, String)>,
    /// Overrides the configured per-request deadline
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
    /// Attach the stored token and refresh on 401
    pub authenticated: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: Vec::new(),
            timeout: None,
            cancel: None,
            authenticated: true,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self { method: Method::POST, body: Some(body), ..Self::default() }
    }

    pub fn put(body: Value) -> Self {
        Self { method: Method::PUT, body: Some(body), ..Self::default() }
    }

    pub fn delete() -> Self {
        Self { method: Method::DELETE, ..Self::default() }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Send without a bearer token; a 401 is reported instead of refreshed
    #[must_use]
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Whether a JSON `Content-Type` goes out by default
    pub(crate) fn sends_json(&self) -> bool {
        self.method != Method::DELETE
    }
}
