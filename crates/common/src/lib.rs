//! Modular common utilities shared across LessonHub crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: token codec, claims, response parsing, header hygiene
//! - `observability`: tracing of degraded parses
//! - `runtime`: typed observables and clocks
//! - `test-utils`: token factory and settable clock for tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod auth;
#[cfg(feature = "foundation")]
pub mod http;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod events;
#[cfg(feature = "runtime")]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use auth::{Claims, Token, TokenDiagnosis};
#[cfg(feature = "runtime")]
pub use events::{Observable, SubscriptionId};
#[cfg(feature = "foundation")]
pub use http::{BodyOutcome, ResponseBody, ResponseParser};
#[cfg(feature = "runtime")]
pub use time::{Clock, SystemClock};
