use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lessonhub_common::testing::{MockClock, TokenFactory};
use lessonhub_common::Clock;
use lessonhub_core::{RefreshCoordinator, SessionState, TokenStore};
use lessonhub_domain::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use lessonhub_domain::{ApiConfig, ApiError, AuthEndpoints};
use lessonhub_infra::{ApiClient, AuthSession, HttpClient, HttpTokenRefresher, MemoryTokenStore};
use wiremock::MockServer;

pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";
pub const SIGNIN_PATH: &str = "/api/v1/auth/signin";
pub const SIGNUP_PATH: &str = "/api/v1/auth/signup";

/// Client stack wired against a wiremock backend and an in-memory store.
pub struct Harness {
    pub server: MockServer,
    pub store: Arc<MemoryTokenStore>,
    pub api: Arc<ApiClient>,
    pub session: AuthSession,
    pub clock: MockClock,
    pub auth_failures: Arc<AtomicUsize>,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with_timeout(Duration::from_secs(5)).await
    }

    pub async fn start_with_timeout(timeout: Duration) -> Self {
        let server = MockServer::start().await;
        let config = ApiConfig {
            base_url: server.uri(),
            timeout_ms: timeout.as_millis() as u64,
            ..ApiConfig::default()
        };
        let endpoints = AuthEndpoints::default();

        let store = Arc::new(MemoryTokenStore::new());
        let dyn_store: Arc<dyn TokenStore> = store.clone();
        let clock = MockClock::new();
        let state = Arc::new(SessionState::new(dyn_store, Arc::new(clock.clone())));

        let http = HttpClient::from_config(&config).expect("http client");
        let refresher = HttpTokenRefresher::new(http.clone(), &config.base_url, REFRESH_PATH)
            .expect("refresher");

        let auth_failures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&auth_failures);
        let coordinator = RefreshCoordinator::new(state, Arc::new(refresher))
            .with_failure_handler(Arc::new(move |_: &ApiError| {
                counter.fetch_add(1, Ordering::SeqCst);
            }));

        let api = Arc::new(ApiClient::new(http, &config, Arc::new(coordinator)).expect("api client"));
        let session = AuthSession::new(Arc::clone(&api), endpoints);

        Self { server, store, api, session, clock, auth_failures }
    }

    /// Persist a signed-in session and restore it, as after an app restart
    pub async fn seed_session(&self, access: &str, refresh: &str) {
        self.store.set(ACCESS_TOKEN_KEY, access).await.expect("seed access");
        self.store.set(REFRESH_TOKEN_KEY, refresh).await.expect("seed refresh");
        self.store.set(USER_KEY, r#"{"email":"teacher@school.test"}"#).await.expect("seed user");
        let session = self.session.init().await;
        assert!(session.is_authenticated, "seeded session should restore");
    }

    /// Unexpired token for `subject`, relative to the harness clock
    pub fn token_for(&self, subject: &str) -> String {
        TokenFactory::expiring_at(self.clock.unix_seconds() + 600).subject(subject).build()
    }

    pub fn auth_failure_count(&self) -> usize {
        self.auth_failures.load(Ordering::SeqCst)
    }

    pub async fn requests_to(&self, path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == path)
            .count()
    }
}

/// Distinct, unexpired token for `subject`
pub fn token_for(subject: &str) -> String {
    TokenFactory::expiring_at(MockClock::new().unix_seconds() + 600).subject(subject).build()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
