//! Port interfaces for authentication
//!
//! These traits define the boundaries between the session logic and the
//! infrastructure that stores credentials, talks to the refresh endpoint and
//! reacts to a session that cannot be recovered.

use async_trait::async_trait;
use lessonhub_domain::{ApiError, RefreshResponse, Result};

/// Persistent client-side key-value store for session credentials
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Value stored under `key`, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace the value under `key`
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; deleting a missing key succeeds
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Exchanges a refresh credential for new tokens
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse>;
}

/// Called once per unrecoverable authentication failure
///
/// Runs after the session has been cleared and subscribers notified. The
/// usual reaction is navigating to a sign-in screen.
pub trait AuthFailureHandler: Send + Sync {
    fn on_auth_failure(&self, error: &ApiError);
}

impl<F> AuthFailureHandler for F
where
    F: Fn(&ApiError) + Send + Sync,
{
    fn on_auth_failure(&self, error: &ApiError) {
        self(error);
    }
}
