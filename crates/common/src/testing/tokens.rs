//! Unsigned token minting
//!
//! The client never verifies signatures, so a fixed signature segment is
//! enough to produce tokens it accepts.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::{json, Map, Value};

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const SIGNATURE: &str = "dGVzdC1zaWduYXR1cmU";

/// Builder for bearer tokens with chosen claims
#[derive(Debug, Clone, Default)]
pub struct TokenFactory {
    claims: Map<String, Value>,
}

impl TokenFactory {
    /// Factory with no claims at all (the result has no `exp`)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expiring_at(exp: i64) -> Self {
        Self::new().claim("exp", exp)
    }

    #[must_use]
    pub fn subject(self, sub: &str) -> Self {
        self.claim("sub", sub)
    }

    /// Roles under the `authorities` claim
    #[must_use]
    pub fn authorities(self, roles: &[&str]) -> Self {
        self.claim("authorities", json!(roles))
    }

    #[must_use]
    pub fn claim(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(key.to_owned(), value.into());
        self
    }

    /// Encoded `header.payload.signature`
    pub fn build(&self) -> String {
        let header = URL_SAFE_NO_PAD.encode(HEADER);
        let payload = URL_SAFE_NO_PAD.encode(Value::Object(self.claims.clone()).to_string());
        format!("{header}.{payload}.{SIGNATURE}")
    }
}

/// Wall-clock Unix seconds
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

/// Token valid for `secs` more seconds of real time
pub fn token_valid_for(secs: i64) -> String {
    TokenFactory::expiring_at(unix_now() + secs).build()
}

/// Token that expired an hour ago
pub fn expired_token() -> String {
    TokenFactory::expiring_at(unix_now() - 3_600).build()
}
