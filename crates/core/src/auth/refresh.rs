//! Single-flight token refresh
//!
//! ```text
//!            401 observed (first caller becomes owner)
//!   Idle ───────────────────────────────────────────► Refreshing
//!    ▲                                                     │
//!    │   success: persist tokens, resolve waiters FIFO     │
//!    └─────────────────────────────────────────────────────┘
//!        failure: clear session, reject waiters,
//!                 call the auth failure handler once
//! ```
//!
//! While a refresh is running every other caller parks a waiter instead of
//! starting a second refresh, so at most one refresh call is outstanding at
//! any instant. The owner and every waiter then retry their own request
//! exactly once with the resulting token.
//!
//! The session is cleared before the coordinator leaves `Refreshing`, so a
//! 401 that arrives while credentials are being wiped joins the failed
//! flight instead of replaying the rejected refresh credential.
//!
//! If the owning future is dropped (its request timed out or was
//! cancelled) the oldest waiter takes over the refresh. Only the
//! coordinator's own failure path ever rejects waiters.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use lessonhub_common::auth::{usable_token, Token};
use lessonhub_domain::{ApiError, Result};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::ports::{AuthFailureHandler, TokenRefresher};
use super::session_state::SessionState;

/// What a parked caller is told when it is woken
enum Signal {
    Settled(Result<Token>),
    TakeOver,
}

type Waiter = oneshot::Sender<Signal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Refreshing,
}

struct Flight {
    phase: Phase,
    waiters: VecDeque<Waiter>,
}

impl Flight {
    /// Leave `Refreshing` and hand back the parked waiters in FIFO order
    fn land(&mut self) -> VecDeque<Waiter> {
        self.phase = Phase::Idle;
        std::mem::take(&mut self.waiters)
    }

    /// Pass ownership to the oldest waiter still listening; with nobody
    /// left the flight returns to `Idle`
    fn hand_over(&mut self) {
        while let Some(waiter) = self.waiters.pop_front() {
            if waiter.send(Signal::TakeOver).is_ok() {
                debug!(remaining = self.waiters.len(), "Refresh handed to the next waiter");
                return;
            }
        }
        self.phase = Phase::Idle;
    }
}

enum Role {
    Owner,
    Waiter(Parked),
}

/// Coordinates refreshes across concurrent callers
pub struct RefreshCoordinator {
    state: Arc<SessionState>,
    refresher: Arc<dyn TokenRefresher>,
    on_failure: Option<Arc<dyn AuthFailureHandler>>,
    flight: Arc<Mutex<Flight>>,
}

impl RefreshCoordinator {
    pub fn new(state: Arc<SessionState>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            state,
            refresher,
            on_failure: None,
            flight: Arc::new(Mutex::new(Flight { phase: Phase::Idle, waiters: VecDeque::new() })),
        }
    }

    /// Callback for unrecoverable auth failures (typically a redirect to
    /// sign-in)
    #[must_use]
    pub fn with_failure_handler(mut self, handler: Arc<dyn AuthFailureHandler>) -> Self {
        self.on_failure = Some(handler);
        self
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn is_refreshing(&self) -> bool {
        self.flight.lock().phase == Phase::Refreshing
    }

    pub fn waiter_count(&self) -> usize {
        self.flight.lock().waiters.len()
    }

    /// Token to attach to an authenticated request
    ///
    /// A signed-out session yields `None`. A session whose token has
    /// lapsed goes through the refresh flow first, so it either comes
    /// back with a fresh token or ends in a logout.
    ///
    /// # Errors
    /// Store failures, or `RefreshFailed` when a lapsed session could not
    /// be renewed (the session has been cleared by then).
    pub async fn usable_token(&self) -> Result<Option<Token>> {
        if let Some(token) = self.state.current_token().await? {
            return Ok(Some(token));
        }
        if !self.state.has_lapsed() {
            return Ok(None);
        }

        debug!("Session token lapsed, renewing before sending");
        self.refresh().await.map(Some)
    }

    /// Obtain a fresh token, starting a refresh or joining the running one
    ///
    /// # Errors
    /// Returns `RefreshFailed` when the refresh fails; by then the session
    /// has been cleared.
    pub async fn refresh(&self) -> Result<Token> {
        self.refresh_after(None).await
    }

    /// Obtain a token to retry a request that was rejected while carrying
    /// `rejected`
    ///
    /// When a newer token than `rejected` already exists (another caller
    /// refreshed in the meantime) it is returned without a second refresh.
    ///
    /// # Errors
    /// Returns `RefreshFailed` when the refresh fails; by then the session
    /// has been cleared.
    pub async fn refresh_after(&self, rejected: Option<&Token>) -> Result<Token> {
        if let Some(rejected) = rejected {
            if let Ok(Some(current)) = self.state.current_token().await {
                if current != *rejected {
                    debug!("Token already replaced, retrying without refresh");
                    return Ok(current);
                }
            }
        }

        match self.claim_role() {
            Role::Owner => self.run_as_owner().await,
            Role::Waiter(mut parked) => {
                debug!("Refresh in flight, waiting for its outcome");
                match (&mut parked.receiver).await {
                    Ok(Signal::Settled(outcome)) => outcome,
                    Ok(Signal::TakeOver) => {
                        debug!("Previous refresh owner went away, taking over");
                        self.run_as_owner().await
                    }
                    Err(_) => Err(ApiError::refresh_failed("Token refresh was abandoned")),
                }
            }
        }
    }

    fn claim_role(&self) -> Role {
        let mut flight = self.flight.lock();
        match flight.phase {
            Phase::Refreshing => {
                let (sender, receiver) = oneshot::channel();
                flight.waiters.push_back(sender);
                Role::Waiter(Parked { receiver, flight: Arc::clone(&self.flight) })
            }
            Phase::Idle => {
                flight.phase = Phase::Refreshing;
                Role::Owner
            }
        }
    }

    /// Runs with the flight already in `Refreshing`
    async fn run_as_owner(&self) -> Result<Token> {
        info!("Refreshing access token");
        let guard = FlightGuard { flight: Arc::clone(&self.flight), landed: false };

        let outcome = self.exchange().await;
        if let Err(err) = &outcome {
            warn!(error = %err, "Token refresh failed, clearing session");
            self.state.clear().await;
        }

        let waiters = guard.land();
        debug!(waiters = waiters.len(), success = outcome.is_ok(), "Refresh finished");
        for waiter in waiters {
            let _ = waiter.send(Signal::Settled(outcome.clone()));
        }

        match &outcome {
            Ok(_) => info!("Access token refreshed"),
            Err(err) => {
                if let Some(handler) = &self.on_failure {
                    handler.on_auth_failure(err);
                }
            }
        }
        outcome
    }

    /// Perform the refresh call and persist its result
    async fn exchange(&self) -> Result<Token> {
        let refresh_token = self
            .state
            .refresh_credential()
            .await
            .map_err(|err| as_refresh_failure("Failed to read refresh token", &err))?
            .ok_or_else(|| ApiError::refresh_failed("No refresh token available"))?;

        let response = self
            .refresher
            .refresh(&refresh_token)
            .await
            .map_err(|err| as_refresh_failure("Token refresh request failed", &err))?;

        let raw = response
            .token
            .as_deref()
            .ok_or_else(|| ApiError::refresh_failed("Refresh response did not contain a token"))?;
        let token = usable_token(raw, self.state.now()).ok_or_else(|| {
            ApiError::refresh_failed("Refresh response contained an unusable token")
        })?;

        self.state
            .store_tokens(&token, response.refresh_token.as_deref())
            .await
            .map_err(|err| as_refresh_failure("Failed to persist refreshed token", &err))?;
        Ok(token)
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flight = self.flight.lock();
        f.debug_struct("RefreshCoordinator")
            .field("phase", &flight.phase)
            .field("waiters", &flight.waiters.len())
            .field("has_failure_handler", &self.on_failure.is_some())
            .finish()
    }
}

fn as_refresh_failure(context: &str, cause: &ApiError) -> ApiError {
    let mut err = ApiError::refresh_failed(format!("{context}: {}", cause.message));
    err.status = cause.status;
    err.data = cause.data.clone();
    err
}

/// Hands the flight on when the owner never finishes
struct FlightGuard {
    flight: Arc<Mutex<Flight>>,
    landed: bool,
}

impl FlightGuard {
    fn land(mut self) -> VecDeque<Waiter> {
        self.landed = true;
        self.flight.lock().land()
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if !self.landed {
            warn!("Refresh owner dropped before finishing");
            self.flight.lock().hand_over();
        }
    }
}

/// A waiter's receiving end
///
/// A waiter dropped after being picked as the next owner passes the
/// ownership on instead of swallowing it.
struct Parked {
    receiver: oneshot::Receiver<Signal>,
    flight: Arc<Mutex<Flight>>,
}

impl Drop for Parked {
    fn drop(&mut self) {
        if let Ok(Signal::TakeOver) = self.receiver.try_recv() {
            self.flight.lock().hand_over();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::future::join_all;
    use lessonhub_common::testing::{MockClock, TokenFactory};
    use lessonhub_domain::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
    use lessonhub_domain::{ErrorKind, RefreshResponse, Session};
    use tokio::sync::Notify;

    use super::*;
    use crate::auth::test_support::RecordingStore;

    const NOW: i64 = 1_700_000_000;

    fn fresh(exp_offset: i64) -> String {
        TokenFactory::expiring_at(NOW + exp_offset).build()
    }

    /// Refresher that blocks until released and counts its calls
    struct GatedRefresher {
        calls: AtomicUsize,
        gate: Notify,
        reply: Mutex<Result<RefreshResponse>>,
    }

    impl GatedRefresher {
        fn replying(reply: Result<RefreshResponse>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Notify::new(),
                reply: Mutex::new(reply),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenRefresher for GatedRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<RefreshResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            self.reply.lock().clone()
        }
    }

    /// Refresher that fails straight away
    #[derive(Default)]
    struct RevokedRefresher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenRefresher for RevokedRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<RefreshResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::new(ErrorKind::Unauthorized, "refresh token revoked").with_status(401))
        }
    }

    struct Fixture {
        store: Arc<RecordingStore>,
        clock: MockClock,
        state: Arc<SessionState>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(RecordingStore::default());
        store.put(ACCESS_TOKEN_KEY, &fresh(60));
        store.put(REFRESH_TOKEN_KEY, "r-1");
        store.put(USER_KEY, "{}");
        let clock = MockClock::at_unix(NOW as u64);
        let state = Arc::new(SessionState::new(store.clone(), Arc::new(clock.clone())));
        Fixture { store, clock, state }
    }

    fn counting_handler(count: &Arc<AtomicUsize>) -> Arc<dyn AuthFailureHandler> {
        let count = Arc::clone(count);
        Arc::new(move |_: &ApiError| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn wait_for_waiters(coordinator: &RefreshCoordinator, count: usize) {
        for _ in 0..200 {
            if coordinator.waiter_count() == count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {count} waiters, saw {}", coordinator.waiter_count());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let fx = fixture();
        let new_token = fresh(3_600);
        let refresher = GatedRefresher::replying(Ok(RefreshResponse {
            token: Some(new_token.clone()),
            refresh_token: Some("r-2".into()),
        }));
        let coordinator = Arc::new(RefreshCoordinator::new(fx.state.clone(), refresher.clone()));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move { coordinator.refresh().await })
            })
            .collect();

        wait_for_waiters(&coordinator, 4).await;
        assert!(coordinator.is_refreshing());
        refresher.gate.notify_one();

        for result in join_all(tasks).await {
            assert_eq!(result.unwrap().unwrap().as_str(), new_token);
        }
        assert_eq!(refresher.calls(), 1);
        assert!(!coordinator.is_refreshing());
        assert_eq!(fx.store.value(ACCESS_TOKEN_KEY), Some(new_token));
        assert_eq!(fx.store.value(REFRESH_TOKEN_KEY).as_deref(), Some("r-2"));
    }

    #[tokio::test]
    async fn test_failure_rejects_everyone_and_clears_session() {
        let fx = fixture();
        fx.state.restore().await;
        let refresher = GatedRefresher::replying(Err(
            ApiError::new(ErrorKind::Unauthorized, "refresh token revoked").with_status(401),
        ));

        let handler_calls = Arc::new(AtomicUsize::new(0));
        let seen_by_handler = Arc::clone(&handler_calls);
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        fx.state.subscribe(move |session: &Session| sink.lock().push(session.is_authenticated));

        let coordinator = Arc::new(
            RefreshCoordinator::new(fx.state.clone(), refresher.clone()).with_failure_handler(
                Arc::new(move |err: &ApiError| {
                    assert_eq!(err.kind, ErrorKind::RefreshFailed);
                    seen_by_handler.fetch_add(1, Ordering::SeqCst);
                }),
            ),
        );

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move { coordinator.refresh().await })
            })
            .collect();
        wait_for_waiters(&coordinator, 2).await;
        refresher.gate.notify_one();

        for result in join_all(tasks).await {
            let err = result.unwrap().unwrap_err();
            assert_eq!(err.kind, ErrorKind::RefreshFailed);
            assert_eq!(err.status, Some(401));
        }
        assert_eq!(refresher.calls(), 1);
        assert_eq!(handler_calls.load(Ordering::SeqCst), 1);
        assert!(!fx.state.is_authenticated());
        assert!(fx.store.is_empty());
        assert_eq!(*observed.lock(), vec![false]);
    }

    #[tokio::test]
    async fn test_missing_refresh_credential_fails_without_calling_out() {
        let fx = fixture();
        fx.store.put(REFRESH_TOKEN_KEY, "  ");
        let refresher = GatedRefresher::replying(Ok(RefreshResponse::default()));
        let coordinator = RefreshCoordinator::new(fx.state.clone(), refresher.clone());

        let err = coordinator.refresh().await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::RefreshFailed);
        assert_eq!(refresher.calls(), 0);
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_unusable_refreshed_token_is_a_failure() {
        let fx = fixture();
        let refresher = GatedRefresher::replying(Ok(RefreshResponse {
            token: Some(fresh(-1)),
            refresh_token: None,
        }));
        refresher.gate.notify_one();
        let coordinator = RefreshCoordinator::new(fx.state.clone(), refresher.clone());

        let err = coordinator.refresh().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::RefreshFailed);
        assert!(err.message.contains("unusable"));
    }

    #[tokio::test]
    async fn test_rotation_is_optional() {
        let fx = fixture();
        let refresher = GatedRefresher::replying(Ok(RefreshResponse {
            token: Some(fresh(600)),
            refresh_token: None,
        }));
        refresher.gate.notify_one();
        let coordinator = RefreshCoordinator::new(fx.state.clone(), refresher);

        coordinator.refresh().await.unwrap();
        assert_eq!(fx.store.value(REFRESH_TOKEN_KEY).as_deref(), Some("r-1"));
    }

    #[tokio::test]
    async fn test_stale_rejection_reuses_newer_token() {
        let fx = fixture();
        let old = Token::parse(&fresh(60)).unwrap();
        let newer = fresh(3_600);
        fx.store.put(ACCESS_TOKEN_KEY, &newer);
        let refresher = GatedRefresher::replying(Ok(RefreshResponse::default()));
        let coordinator = RefreshCoordinator::new(fx.state.clone(), refresher.clone());

        let token = coordinator.refresh_after(Some(&old)).await.unwrap();

        assert_eq!(token.as_str(), newer);
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_refresh_is_taken_over_by_a_waiter() {
        let fx = fixture();
        fx.state.restore().await;
        let new_token = fresh(3_600);
        let refresher = GatedRefresher::replying(Ok(RefreshResponse {
            token: Some(new_token.clone()),
            refresh_token: None,
        }));
        let failures = Arc::new(AtomicUsize::new(0));
        let coordinator = Arc::new(
            RefreshCoordinator::new(fx.state.clone(), refresher.clone())
                .with_failure_handler(counting_handler(&failures)),
        );

        let owner = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh().await })
        };
        while refresher.calls() == 0 {
            tokio::task::yield_now().await;
        }
        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh().await })
        };
        wait_for_waiters(&coordinator, 1).await;

        owner.abort();
        while refresher.calls() < 2 {
            tokio::task::yield_now().await;
        }
        assert!(coordinator.is_refreshing());
        refresher.gate.notify_one();

        let token = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter finished")
            .unwrap()
            .unwrap();

        assert_eq!(token.as_str(), new_token);
        assert!(!coordinator.is_refreshing());
        assert!(fx.state.is_authenticated());
        assert_eq!(failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_abandoned_refresh_with_no_waiters_returns_to_idle() {
        let fx = fixture();
        let refresher = GatedRefresher::replying(Ok(RefreshResponse::default()));
        let coordinator = Arc::new(RefreshCoordinator::new(fx.state.clone(), refresher.clone()));

        let owner = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.refresh().await })
        };
        while refresher.calls() == 0 {
            tokio::task::yield_now().await;
        }
        owner.abort();
        assert!(owner.await.unwrap_err().is_cancelled());

        assert!(!coordinator.is_refreshing());
        assert_eq!(fx.store.value(REFRESH_TOKEN_KEY).as_deref(), Some("r-1"));
    }

    #[tokio::test]
    async fn test_refresh_arriving_while_session_is_wiped_joins_the_failed_flight() {
        let fx = fixture();
        fx.state.restore().await;
        fx.store.yield_on_removal(true);
        let refresher = Arc::new(RevokedRefresher::default());
        let failures = Arc::new(AtomicUsize::new(0));
        let coordinator = RefreshCoordinator::new(fx.state.clone(), refresher.clone())
            .with_failure_handler(counting_handler(&failures));

        let (first, second) = tokio::join!(coordinator.refresh(), coordinator.refresh());

        assert_eq!(first.unwrap_err().kind, ErrorKind::RefreshFailed);
        assert_eq!(second.unwrap_err().kind, ErrorKind::RefreshFailed);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert!(fx.store.is_empty());
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_lapsed_session_is_renewed_before_use() {
        let fx = fixture();
        fx.state.restore().await;
        fx.clock.advance_secs(120);
        assert!(!fx.state.is_authenticated());

        let renewed = TokenFactory::expiring_at(NOW + 3_600).build();
        let refresher = GatedRefresher::replying(Ok(RefreshResponse {
            token: Some(renewed.clone()),
            refresh_token: None,
        }));
        refresher.gate.notify_one();
        let coordinator = RefreshCoordinator::new(fx.state.clone(), refresher.clone());

        let token = coordinator.usable_token().await.unwrap().unwrap();

        assert_eq!(token.as_str(), renewed);
        assert_eq!(refresher.calls(), 1);
        assert!(fx.state.is_authenticated());
    }

    #[tokio::test]
    async fn test_lapsed_session_logs_out_when_renewal_fails() {
        let fx = fixture();
        fx.state.restore().await;
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        fx.state.subscribe(move |session: &Session| sink.lock().push(session.clone()));
        fx.clock.advance_secs(120);

        let failures = Arc::new(AtomicUsize::new(0));
        let coordinator =
            RefreshCoordinator::new(fx.state.clone(), Arc::new(RevokedRefresher::default()))
                .with_failure_handler(counting_handler(&failures));

        let err = coordinator.usable_token().await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::RefreshFailed);
        assert!(!fx.state.has_lapsed());
        assert!(fx.store.is_empty());
        assert_eq!(*observed.lock(), vec![Session::anonymous()]);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_signed_out_session_sends_without_token() {
        let fx = fixture();
        fx.store.put(ACCESS_TOKEN_KEY, &fresh(-10));
        let refresher = GatedRefresher::replying(Ok(RefreshResponse::default()));
        let coordinator = RefreshCoordinator::new(fx.state.clone(), refresher.clone());

        assert!(coordinator.usable_token().await.unwrap().is_none());
        assert_eq!(refresher.calls(), 0);
    }
}
