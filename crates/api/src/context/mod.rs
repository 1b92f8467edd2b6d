//! Application context - dependency injection container

use std::sync::Arc;

use lessonhub_common::SystemClock;
use lessonhub_core::{AuthFailureHandler, RefreshCoordinator, SessionState, TokenStore};
use lessonhub_domain::{ApiError, ClientConfig, Result};
use lessonhub_infra::{build_store, config, ApiClient, AuthSession, HttpClient, HttpTokenRefresher};
use tracing::{info, warn};

/// Application context - holds the client stack
pub struct AppContext {
    pub config: ClientConfig,
    pub store: Arc<dyn TokenStore>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub api: Arc<ApiClient>,
    pub session: Arc<AuthSession>,
}

impl AppContext {
    /// Wire the stack for `config`, using the configured token store
    ///
    /// Unrecoverable auth failures are only logged; use
    /// [`AppContext::with_failure_handler`] to react to them (e.g. show the
    /// sign-in screen).
    ///
    /// # Errors
    /// Returns `Config` for an invalid base URL or storage configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_failure_handler(config, Arc::new(log_auth_failure))
    }

    /// # Errors
    /// As [`AppContext::new`].
    pub fn with_failure_handler(
        config: ClientConfig,
        on_failure: Arc<dyn AuthFailureHandler>,
    ) -> Result<Self> {
        let store = build_store(&config.storage)?;
        Self::with_store(config, store, on_failure)
    }

    /// Wire the stack around an existing store
    ///
    /// # Errors
    /// As [`AppContext::new`].
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        on_failure: Arc<dyn AuthFailureHandler>,
    ) -> Result<Self> {
        let state = Arc::new(SessionState::new(Arc::clone(&store), Arc::new(SystemClock)));

        let http = HttpClient::from_config(&config.api)?;
        let refresher =
            HttpTokenRefresher::new(http.clone(), &config.api.base_url, &config.auth.refresh_path)?;
        let coordinator = Arc::new(
            RefreshCoordinator::new(state, Arc::new(refresher)).with_failure_handler(on_failure),
        );

        let api = Arc::new(ApiClient::new(http, &config.api, Arc::clone(&coordinator))?);
        let session = Arc::new(AuthSession::new(Arc::clone(&api), config.auth.clone()));

        info!(
            base_url = %api.base_url(),
            storage = %config.storage.backend,
            "Application context created"
        );

        Ok(Self { config, store, coordinator, api, session })
    }

    /// Load configuration from the environment or a config file, then wire
    ///
    /// # Errors
    /// Returns `Config` when no configuration can be loaded.
    pub fn from_env() -> Result<Self> {
        Self::new(config::load()?)
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("session", &self.session.snapshot())
            .finish_non_exhaustive()
    }
}

fn log_auth_failure(error: &ApiError) {
    warn!(kind = %error.kind, "Session ended, sign-in required");
}
