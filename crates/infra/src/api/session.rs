//! Sign-in, sign-up, logout and session observation
//!
//! Unlike the rest of the client, sign-in and sign-up never return `Err`:
//! they resolve to an [`AuthOutcome`] whose `success` flag a form can
//! branch on.

use std::sync::Arc;

use lessonhub_common::auth::usable_token;
use lessonhub_common::SubscriptionId;
use lessonhub_core::SessionState;
use lessonhub_domain::{
    ApiError, AuthEndpoints, AuthResponse, Credentials, Result, Session, SignupRequest,
    UserRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::client::ApiClient;
use super::options::RequestOptions;

/// Result of a session operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AuthResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl AuthOutcome {
    pub fn succeeded(data: AuthResponse) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn failed(error: ApiError) -> Self {
        Self { success: false, data: None, error: Some(error) }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// One authenticated session against the backend
pub struct AuthSession {
    api: Arc<ApiClient>,
    endpoints: AuthEndpoints,
}

impl AuthSession {
    pub fn new(api: Arc<ApiClient>, endpoints: AuthEndpoints) -> Self {
        Self { api, endpoints }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    fn state(&self) -> &Arc<SessionState> {
        self.api.coordinator().session()
    }

    /// Restore the session from storage; makes no network call
    pub async fn init(&self) -> Session {
        self.state().restore().await
    }

    #[instrument(skip_all)]
    pub async fn signin(&self, credentials: &Credentials) -> AuthOutcome {
        let fallback = UserRecord::from_email(credentials.email.clone());
        let outcome = match serde_json::to_value(credentials) {
            Ok(body) => self.authenticate(&self.endpoints.signin_path, body, fallback).await,
            Err(err) => Err(ApiError::invalid_request(format!("Invalid credentials: {err}"))),
        };
        settle("Sign-in", outcome)
    }

    #[instrument(skip_all)]
    pub async fn signup(&self, request: &SignupRequest) -> AuthOutcome {
        let fallback = request.to_user_record();
        let outcome = match serde_json::to_value(request) {
            Ok(body) => self.authenticate(&self.endpoints.signup_path, body, fallback).await,
            Err(err) => Err(ApiError::invalid_request(format!("Invalid sign-up payload: {err}"))),
        };
        settle("Sign-up", outcome)
    }

    /// Clear stored credentials and notify subscribers; safe to repeat
    pub async fn logout(&self) {
        self.state().clear().await;
    }

    /// Force a token refresh outside the request pipeline
    ///
    /// A failure clears the session exactly like a failed automatic
    /// refresh.
    pub async fn refresh(&self) -> AuthOutcome {
        match self.api.coordinator().refresh().await {
            Ok(token) => AuthOutcome::succeeded(AuthResponse {
                token: Some(token.into_inner()),
                user: self.current_user(),
                ..AuthResponse::default()
            }),
            Err(err) => AuthOutcome::failed(err),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        self.state().subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state().unsubscribe(id)
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.state().current_user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    pub fn snapshot(&self) -> Session {
        self.state().snapshot()
    }

    async fn authenticate(
        &self,
        endpoint: &str,
        body: Value,
        fallback: UserRecord,
    ) -> Result<AuthResponse> {
        let options = RequestOptions::post(body).unauthenticated();
        let response: AuthResponse = self.api.request(endpoint, options).await?.into_typed()?;

        let state = self.state();
        let token = response
            .token
            .as_deref()
            .and_then(|raw| usable_token(raw, state.now()))
            .ok_or_else(|| ApiError::malformed_token("No token received"))?;
        let user = response.user.clone().unwrap_or(fallback);

        state.establish(&token, response.refresh_token.as_deref(), user).await?;
        Ok(response)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("endpoints", &self.endpoints)
            .field("session", &self.snapshot())
            .finish()
    }
}

fn settle(operation: &str, outcome: Result<AuthResponse>) -> AuthOutcome {
    match outcome {
        Ok(response) => {
            info!(operation, "Authentication succeeded");
            AuthOutcome::succeeded(response)
        }
        Err(err) => {
            warn!(operation, kind = %err.kind, status = ?err.status, "Authentication failed");
            AuthOutcome::failed(err)
        }
    }
}
