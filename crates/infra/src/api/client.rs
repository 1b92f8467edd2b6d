//! Request pipeline for the backend API
//!
//! Every call goes through the same steps:
//!
//! 1. attach `Authorization: Bearer <token>` when a usable token is stored;
//!    a signed-in session whose token has lapsed is renewed first
//! 2. send
//! 3. 2xx → [`ResponseParser`]; 401 → single-flight refresh, then one
//!    retry; anything else → [`classify_status`]
//!
//! The whole pipeline, refresh included, runs under a per-request deadline
//! and an optional cancellation token.

use std::sync::Arc;
use std::time::Duration;

use lessonhub_common::http::sanitize_header_value;
use lessonhub_common::{ResponseBody, ResponseParser, Token};
use lessonhub_core::RefreshCoordinator;
use lessonhub_domain::{classify_status, ApiConfig, ApiError, ErrorKind, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::options::RequestOptions;
use super::routes::CandidateRoutes;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Authenticated API client
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    default_timeout: Duration,
    coordinator: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// # Errors
    /// Returns `Config` when `base_url` is not an absolute http(s) URL.
    pub fn new(
        http: HttpClient,
        config: &ApiConfig,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Result<Self> {
        Ok(Self {
            http,
            base_url: validate_base_url(&config.base_url)?,
            default_timeout: config.timeout(),
            coordinator,
        })
    }

    /// Client with its own transport built from `config`
    ///
    /// # Errors
    /// Returns `Config` for an invalid base URL; transport build failures
    /// are propagated.
    pub fn from_config(config: &ApiConfig, coordinator: Arc<RefreshCoordinator>) -> Result<Self> {
        Self::new(HttpClient::from_config(config)?, config, coordinator)
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute http(s) endpoints are used as-is, anything else is
    /// appended to the base URL
    ///
    /// # Errors
    /// Returns `InvalidRequest` when the result is not a valid URL.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        join_endpoint(&self.base_url, endpoint)
    }

    /// Perform one API call
    ///
    /// # Errors
    /// - `Forbidden`, `ResourceLocked`, `HttpError` for non-2xx answers
    /// - `RefreshFailed` when a 401 could not be recovered (the session is
    ///   cleared by then)
    /// - `Unauthorized` when the retried request is rejected again, or for
    ///   unauthenticated requests
    /// - `NetworkUnreachable`, `Timeout`, `Cancelled`, `InvalidRequest`
    #[instrument(skip(self, options), fields(method = %options.method, endpoint = %endpoint))]
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<ResponseBody> {
        let url = self.endpoint_url(endpoint)?;
        let deadline = options.timeout.unwrap_or(self.default_timeout);

        let timed = async {
            tokio::time::timeout(deadline, self.execute(&url, &options, deadline))
                .await
                .unwrap_or_else(|_| {
                    warn!(?deadline, "Request deadline elapsed");
                    Err(ApiError::timeout(deadline))
                })
        };

        match options.cancel.as_ref() {
            Some(cancel) => tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Request cancelled by caller");
                    Err(ApiError::cancelled())
                }
                result = timed => result,
            },
            None => timed.await,
        }
    }

    /// `GET` and deserialize the body
    ///
    /// # Errors
    /// As [`ApiClient::request`], plus `ParseError` when the body does not
    /// fit `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        Ok(self.request(endpoint, RequestOptions::get()).await?.into_typed()?)
    }

    /// `POST` a JSON body and deserialize the answer
    ///
    /// # Errors
    /// As [`ApiClient::get_json`], plus `InvalidRequest` when `body` cannot
    /// be serialized.
    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::post(to_json_body(body)?);
        Ok(self.request(endpoint, options).await?.into_typed()?)
    }

    /// `PUT` a JSON body and deserialize the answer
    ///
    /// # Errors
    /// As [`ApiClient::post_json`].
    pub async fn put_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::put(to_json_body(body)?);
        Ok(self.request(endpoint, options).await?.into_typed()?)
    }

    /// # Errors
    /// As [`ApiClient::request`].
    pub async fn delete(&self, endpoint: &str) -> Result<ResponseBody> {
        self.request(endpoint, RequestOptions::delete()).await
    }

    /// Try each route in order and return the first success
    ///
    /// When every route fails the last error is returned. A failed refresh
    /// or a cancellation stops the sequence at once.
    ///
    /// # Errors
    /// As [`ApiClient::request`].
    pub async fn request_candidates(
        &self,
        routes: &CandidateRoutes,
        options: RequestOptions,
    ) -> Result<ResponseBody> {
        let mut last_error = None;

        for route in routes.iter() {
            match self.request(route, options.clone()).await {
                Ok(body) => {
                    if last_error.is_some() {
                        info!(route, "Fallback route accepted the request");
                    }
                    return Ok(body);
                }
                Err(err) if ends_candidate_sequence(&err) => return Err(err),
                Err(err) => {
                    warn!(route, kind = %err.kind, status = ?err.status, "Candidate route failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::invalid_request("No candidate routes to try")))
    }

    async fn execute(
        &self,
        url: &Url,
        options: &RequestOptions,
        deadline: Duration,
    ) -> Result<ResponseBody> {
        let token = if options.authenticated {
            self.coordinator.usable_token().await?
        } else {
            None
        };
        debug!(has_token = token.is_some(), "Sending request");

        let response = self.send_once(url, options, token.as_ref(), deadline).await?;
        if !options.authenticated || response.status() != StatusCode::UNAUTHORIZED {
            return finish(response).await;
        }

        debug!("Request rejected with 401, obtaining a new token");
        let fresh = self.coordinator.refresh_after(token.as_ref()).await?;
        let retried = self.send_once(url, options, Some(&fresh), deadline).await?;
        finish(retried).await
    }

    async fn send_once(
        &self,
        url: &Url,
        options: &RequestOptions,
        token: Option<&Token>,
        deadline: Duration,
    ) -> Result<Response> {
        let headers = build_headers(options, token)?;

        let mut builder = self
            .http
            .request(options.method.clone(), url.clone())
            .headers(headers)
            .timeout(deadline);
        if let Some(body) = &options.body {
            let bytes = serde_json::to_vec(body).map_err(|err| {
                ApiError::invalid_request(format!("Failed to serialize request body: {err}"))
            })?;
            builder = builder.body(bytes);
        }

        self.http.send(builder).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

/// Turn a final response into a body or an error envelope
async fn finish(response: Response) -> Result<ResponseBody> {
    let status = response.status().as_u16();

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        let error = classify_status(status, &body);
        debug!(status, kind = %error.kind, "Request failed");
        return Err(error);
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let text = response.text().await.map_err(|err| ApiError::from(InfraError::from(err)))?;

    let parsed = ResponseParser::parse(status, content_type.as_deref(), &text);
    if parsed.outcome.is_degraded() {
        warn!(status, outcome = ?parsed.outcome, "Response body was not valid JSON");
    }
    Ok(parsed.body)
}

fn build_headers(options: &RequestOptions, token: Option<&Token>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if options.sends_json() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    for (name, value) in &options.headers {
        let header_name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|err| {
            ApiError::invalid_request(format!("Invalid header name '{name}': {err}"))
        })?;
        let header_value = HeaderValue::from_str(&sanitize_header_value(value)).map_err(|err| {
            ApiError::invalid_request(format!("Invalid value for header '{name}': {err}"))
        })?;
        headers.insert(header_name, header_value);
    }

    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&token.bearer())
            .map_err(|_| ApiError::malformed_token("Token cannot be sent as a header"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn to_json_body<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body)
        .map_err(|err| ApiError::invalid_request(format!("Failed to serialize request body: {err}")))
}

fn ends_candidate_sequence(err: &ApiError) -> bool {
    matches!(err.kind, ErrorKind::RefreshFailed | ErrorKind::Cancelled)
}

/// Trimmed base URL, checked to be an absolute http(s) URL
pub(crate) fn validate_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|err| ApiError::config(format!("Invalid api.base_url '{raw}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::config(format!("api.base_url must be http(s), got '{raw}'")));
    }
    Ok(trimmed.to_owned())
}

/// Resolve `endpoint` against `base_url` by concatenation
pub(crate) fn join_endpoint(base_url: &str, endpoint: &str) -> Result<Url> {
    let endpoint = endpoint.trim();
    if let Ok(url) = Url::parse(endpoint) {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(url);
        }
    }

    let joined = if endpoint.starts_with('/') {
        format!("{}{endpoint}", base_url.trim_end_matches('/'))
    } else {
        format!("{}/{endpoint}", base_url.trim_end_matches('/'))
    };
    Url::parse(&joined).map_err(|err| InfraError::from(err).into())
}
