//! # LessonHub Infrastructure
//!
//! Implementations of the `lessonhub-core` ports and the client surface:
//!
//! - [`api`]: `ApiClient` request pipeline, `AuthSession`, refresh exchange
//! - [`http`]: reqwest transport with optional retry
//! - [`storage`]: keychain, file and memory token stores
//! - [`config`]: environment and file configuration loading
//! - [`observability`]: tracing subscriber setup
//!
//! Everything that performs I/O lives here.

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod storage;

// Re-export commonly used items
pub use api::{ApiClient, AuthOutcome, AuthSession, CandidateRoutes, HttpTokenRefresher, RequestOptions};
pub use errors::InfraError;
pub use http::{HttpClient, RetryPolicy};
pub use storage::{build_store, FileTokenStore, KeychainTokenStore, MemoryTokenStore};
