//! Bearer token handling
//!
//! Everything here is pure: no storage, no clock, no I/O. Callers pass the
//! current Unix time in explicitly so expiry checks stay deterministic.
//!
//! # Architecture
//!
//! ```text
//! raw stored string ──► Token::parse ──► Token ──► decode_claims ──► Claims
//!                          (normalize)              (base64url + JSON)
//! ```
//!
//! A [`Token`] can only be obtained through [`Token::parse`], so holding one
//! proves the value passed structural validation.

pub mod claims;
pub mod token;

pub use claims::{Claims, ROLE_CLAIM_PRECEDENCE};
pub use token::{decode_claims, diagnose, is_expired, is_usable, usable_token, Token, TokenDiagnosis};
