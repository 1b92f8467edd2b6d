//! Authenticated API access
//!
//! - [`ApiClient`]: request pipeline with bearer attachment, 401 refresh and
//!   retry, error classification and body parsing
//! - [`AuthSession`]: sign-in, sign-up, logout and session subscription
//! - [`HttpTokenRefresher`]: the refresh endpoint exchange
//! - [`CandidateRoutes`]: ordered fallback endpoints

pub mod client;
pub mod options;
pub mod refresh;
pub mod routes;
pub mod session;

pub use client::ApiClient;
pub use options::RequestOptions;
pub use refresh::HttpTokenRefresher;
pub use routes::CandidateRoutes;
pub use session::{AuthOutcome, AuthSession};
