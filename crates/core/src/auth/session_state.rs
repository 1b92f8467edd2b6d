//! Session value, subscribers and persisted credentials
//!
//! `SessionState` is shared (behind an `Arc`) by the refresh coordinator and
//! the session façade. It is the only writer of persisted credentials, and
//! every read of the stored access token goes through [`Token::parse`] plus
//! an expiry check.
//!
//! The session also remembers the `exp` of the token it was established
//! with. Once that instant passes, [`SessionState::is_authenticated`] and
//! [`SessionState::snapshot`] report a signed-out session until a refresh
//! stores a newer token or the coordinator clears the session.

use std::fmt;
use std::sync::Arc;

use lessonhub_common::auth::{diagnose, usable_token, Token, TokenDiagnosis};
use lessonhub_common::{Clock, Observable, SubscriptionId};
use lessonhub_domain::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, USER_KEY};
use lessonhub_domain::{Result, Session, UserRecord};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::ports::TokenStore;

pub struct SessionState {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    live: RwLock<Live>,
    observers: Observable<Session>,
}

/// Session value plus the expiry of the token backing it
struct Live {
    session: Session,
    expires_at: Option<i64>,
}

impl Live {
    fn signed_out() -> Self {
        Self { session: Session::anonymous(), expires_at: None }
    }

    fn is_current(&self, now: i64) -> bool {
        self.session.is_authenticated && self.expires_at.is_some_and(|exp| exp > now)
    }
}

impl SessionState {
    /// Unauthenticated state backed by `store`
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            live: RwLock::new(Live::signed_out()),
            observers: Observable::new(),
        }
    }

    /// Current session; a session whose token has lapsed reads as signed out
    pub fn snapshot(&self) -> Session {
        let live = self.live.read();
        if live.is_current(self.now()) {
            live.session.clone()
        } else {
            Session::anonymous()
        }
    }

    /// `true` only while the session's token is unexpired
    pub fn is_authenticated(&self) -> bool {
        self.live.read().is_current(self.now())
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.snapshot().user
    }

    /// Marked authenticated, but the token backing it has expired
    pub fn has_lapsed(&self) -> bool {
        let live = self.live.read();
        live.session.is_authenticated && !live.is_current(self.now())
    }

    pub fn now(&self) -> i64 {
        self.clock.unix_seconds()
    }

    /// Register a listener for session changes (FIFO, synchronous)
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Stored access token, if it is well-formed and unexpired
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn current_token(&self) -> Result<Option<Token>> {
        let raw = self.store.get(ACCESS_TOKEN_KEY).await?;
        Ok(raw.as_deref().and_then(|raw| usable_token(raw, self.now())))
    }

    /// Stored refresh credential, blank values count as absent
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn refresh_credential(&self) -> Result<Option<String>> {
        let raw = self.store.get(REFRESH_TOKEN_KEY).await?;
        Ok(raw.map(|value| value.trim().to_owned()).filter(|value| !value.is_empty()))
    }

    /// Persist a fresh sign-in and mark the session authenticated
    ///
    /// # Errors
    /// Propagates store failures; the in-memory session is left untouched
    /// when persisting fails.
    pub async fn establish(
        &self,
        token: &Token,
        refresh_token: Option<&str>,
        user: UserRecord,
    ) -> Result<()> {
        self.store_tokens(token, refresh_token).await?;
        let user_json = serde_json::to_string(&user)?;
        self.store.set(USER_KEY, &user_json).await?;

        self.replace(Session::authenticated(user), expiry_of(token));
        info!("Session established");
        Ok(())
    }

    /// Persist tokens from a refresh; the refresh credential is only
    /// replaced when a new one is supplied
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn store_tokens(&self, token: &Token, refresh_token: Option<&str>) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, token.as_str()).await?;
        if let Some(refresh_token) = refresh_token.map(str::trim).filter(|r| !r.is_empty()) {
            self.store.set(REFRESH_TOKEN_KEY, refresh_token).await?;
        }
        self.live.write().expires_at = expiry_of(token);
        Ok(())
    }

    /// Remove every stored credential, mark unauthenticated and notify
    ///
    /// Store failures are logged and do not stop the remaining removals.
    /// Safe to call when already signed out.
    pub async fn clear(&self) {
        self.wipe_storage().await;
        self.replace(Session::anonymous(), None);
        info!("Session cleared");
    }

    /// Rebuild the session from storage at startup
    ///
    /// A usable stored token restores the stored user (an unreadable user
    /// record becomes `{}`); anything else wipes storage. Subscribers are
    /// notified exactly once, whatever the outcome.
    pub async fn restore(&self) -> Session {
        let raw = match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "Failed to read stored token");
                None
            }
        };

        let diagnosis = diagnose(raw.as_deref(), self.now());
        debug!(token = diagnosis.label(), "Stored token inspected");

        let (session, expires_at) = match diagnosis {
            TokenDiagnosis::Valid { exp, .. } => {
                (Session::authenticated(self.stored_user().await), Some(exp))
            }
            _ => {
                self.wipe_storage().await;
                (Session::anonymous(), None)
            }
        };

        self.replace(session.clone(), expires_at);
        info!(authenticated = session.is_authenticated, "Session restored");
        session
    }

    async fn stored_user(&self) -> UserRecord {
        let raw = match self.store.get(USER_KEY).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "Failed to read stored user");
                None
            }
        };
        raw.and_then(|raw| match serde_json::from_str::<UserRecord>(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(error = %err, "Stored user record is unreadable, using an empty record");
                None
            }
        })
        .unwrap_or_default()
    }

    async fn wipe_storage(&self) {
        for key in SESSION_KEYS {
            if let Err(err) = self.store.remove(key).await {
                warn!(key, error = %err, "Failed to remove stored credential");
            }
        }
    }

    fn replace(&self, session: Session, expires_at: Option<i64>) {
        *self.live.write() = Live { session: session.clone(), expires_at };
        self.observers.notify(&session);
    }
}

fn expiry_of(token: &Token) -> Option<i64> {
    token.claims().map(|claims| claims.exp)
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live = self.live.read();
        f.debug_struct("SessionState")
            .field("session", &live.session)
            .field("expires_at", &live.expires_at)
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}
