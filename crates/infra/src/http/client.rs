use std::time::Duration;

use lessonhub_domain::{ApiConfig, ApiError, Result};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;
use url::Url;

use crate::errors::InfraError;

const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF_DOUBLINGS: u32 = 6;

/// How many times a transient failure is attempted
///
/// Only connect failures, transport timeouts and 5xx answers are
/// transient. A 401 is returned to the caller untouched because the
/// refresh flow owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// One attempt, no retry
    pub const fn none() -> Self {
        Self { max_attempts: 1, base_backoff: DEFAULT_BACKOFF }
    }

    pub fn attempts(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1), ..Self::none() }
    }

    #[must_use]
    pub fn with_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    /// Pause before attempt number `attempt` (the first retry is attempt 2)
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(2).min(MAX_BACKOFF_DOUBLINGS);
        self.base_backoff.saturating_mul(1 << doublings)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// reqwest transport shared by the API client and the refresh exchange
///
/// Status codes are not interpreted beyond the retry decision; callers
/// classify the final response.
#[derive(Clone)]
pub struct HttpClient {
    inner: ReqwestClient,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Transport for the `[api]` section: client-wide timeout, optional
    /// user agent, `max_attempts` as the retry budget
    ///
    /// # Errors
    /// Returns `InvalidRequest` when reqwest rejects the settings.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let mut builder = ReqwestClient::builder().timeout(config.timeout()).no_proxy();
        if let Some(agent) = config.user_agent.as_deref() {
            builder = builder.user_agent(agent);
        }
        let inner = builder.build().map_err(|err| ApiError::from(InfraError::from(err)))?;

        Ok(Self { inner, retry: RetryPolicy::attempts(config.max_attempts) })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner.request(method, url)
    }

    /// Send `builder`, repeating transient failures while the policy allows
    ///
    /// A request whose body cannot be cloned is sent exactly once.
    ///
    /// # Errors
    /// Transport failures after the last attempt, converted to `ApiError`.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let mut request = builder.build().map_err(|err| ApiError::from(InfraError::from(err)))?;
        let mut attempt = 1;

        loop {
            let spare =
                if attempt < self.retry.max_attempts { request.try_clone() } else { None };
            let method = request.method().clone();
            let path = request.url().path().to_owned();

            let outcome = self
                .inner
                .execute(request)
                .await
                .map_err(|err| ApiError::from(InfraError::from(err)));

            let next = match spare {
                Some(next) if is_transient(&outcome) => next,
                _ => return outcome,
            };

            attempt += 1;
            let delay = self.retry.delay_before(attempt);
            debug!(%method, path = %path, attempt, ?delay, "Transient failure, retrying");
            tokio::time::sleep(delay).await;
            request = next;
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").field("retry", &self.retry).finish_non_exhaustive()
    }
}

fn is_transient(outcome: &Result<Response>) -> bool {
    match outcome {
        Ok(response) => response.status().is_server_error(),
        Err(err) => err.is_retryable(),
    }
}
