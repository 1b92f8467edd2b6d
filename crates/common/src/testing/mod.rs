//! Testing utilities and helpers
//!
//! - **[`tokens`]**: mint structurally valid, unsigned bearer tokens
//! - **[`time`]**: settable clock
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "test-utils")]
//! # {
//! use lessonhub_common::testing::{MockClock, TokenFactory};
//! use lessonhub_common::Clock;
//!
//! let clock = MockClock::at_unix(1_700_000_000);
//! let raw = TokenFactory::expiring_at(clock.unix_seconds() + 60)
//!     .subject("t@school.test")
//!     .build();
//! assert!(lessonhub_common::auth::is_usable(&raw, clock.unix_seconds()));
//! # }
//! ```

pub mod time;
pub mod tokens;

pub use time::MockClock;
pub use tokens::{expired_token, token_valid_for, unix_now, TokenFactory};
