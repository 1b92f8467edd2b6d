//! # LessonHub Core
//!
//! Session and refresh logic - no HTTP, no platform storage.
//!
//! This crate contains:
//! - Port interfaces (traits) for token storage, token refresh and the
//!   unrecoverable-auth-failure callback
//! - `SessionState`: the session value, its subscribers and every write of
//!   persisted credentials
//! - `RefreshCoordinator`: single-flight token refresh
//!
//! ## Architecture Principles
//! - Only depends on `lessonhub-common` and `lessonhub-domain`
//! - All external effects via traits
//! - Pure, testable logic

pub mod auth;

pub use auth::ports::{AuthFailureHandler, TokenRefresher, TokenStore};
pub use auth::refresh::RefreshCoordinator;
pub use auth::session_state::SessionState;
