//! Refresh endpoint exchange

use async_trait::async_trait;
use lessonhub_common::ResponseParser;
use lessonhub_core::TokenRefresher;
use lessonhub_domain::{classify_status, ApiError, RefreshRequest, RefreshResponse, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use tracing::debug;
use url::Url;

use super::client::{join_endpoint, validate_base_url};
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Posts `{ "refreshToken": ... }` to the refresh endpoint
///
/// Sent without an `Authorization` header: the access token is the thing
/// being replaced.
#[derive(Debug, Clone)]
pub struct HttpTokenRefresher {
    http: HttpClient,
    url: Url,
}

impl HttpTokenRefresher {
    /// # Errors
    /// Returns `Config` for an invalid base URL and `InvalidRequest` when
    /// the endpoint cannot be resolved.
    pub fn new(http: HttpClient, base_url: &str, refresh_path: &str) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        Ok(Self { http, url: join_endpoint(&base_url, refresh_path)? })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let payload = RefreshRequest { refresh_token: refresh_token.to_owned() };
        let body = serde_json::to_vec(&payload).map_err(|err| {
            ApiError::invalid_request(format!("Failed to serialize refresh request: {err}"))
        })?;

        let request = self
            .http
            .request(Method::POST, self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        let response = self.http.send(request).await?;

        let status = response.status();
        debug!(%status, "Refresh endpoint answered");
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &text));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let text = response.text().await.map_err(|err| ApiError::from(InfraError::from(err)))?;

        let parsed = ResponseParser::parse(status.as_u16(), content_type.as_deref(), &text);
        Ok(parsed.body.into_typed::<RefreshResponse>()?)
    }
}
