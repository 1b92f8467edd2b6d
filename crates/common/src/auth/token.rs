//! Token normalization, claims decoding and expiry checks

use std::fmt;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;

use super::claims::Claims;

/// Three non-empty base64url segments separated by two dots
static TOKEN_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+$")
        .expect("TOKEN_SHAPE should compile - this is a bug")
});

/// base64url decoder that accepts padded and unpadded input
const CLAIMS_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const BEARER_SCHEME: &str = "bearer ";

/// Structurally valid bearer token
///
/// The only constructor is [`Token::parse`]. `Display` and `Debug` never
/// print the token itself.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Normalize a raw stored value into a token
    ///
    /// Steps, each of which may reject the value:
    /// 1. trim, drop embedded CR/LF, trim again
    /// 2. strip one pair of surrounding `"` or `'`
    /// 3. strip a case-insensitive `Bearer ` prefix
    /// 4. require exactly three non-empty base64url segments
    ///
    /// Returns `None` on any failure; an invalid value is never sent.
    pub fn parse(raw: &str) -> Option<Self> {
        let joined: String = raw.trim().chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        let unquoted = strip_quotes(joined.trim()).trim();
        let bare = strip_bearer(unquoted).trim();

        TOKEN_SHAPE.is_match(bare).then(|| Self(bare.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Decoded payload, `None` when it is not base64url JSON with an `exp`
    pub fn claims(&self) -> Option<Claims> {
        decode_claims(self)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<token {} chars>", self.0.len())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&format_args!("{} chars", self.0.len())).finish()
    }
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

fn strip_bearer(value: &str) -> &str {
    match value.get(..BEARER_SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_SCHEME) => &value[BEARER_SCHEME.len()..],
        _ => value,
    }
}

/// Decode the middle segment of `token`
///
/// Undecodable payloads yield `None` instead of an error so callers can
/// treat "unreadable" and "expired" the same way.
pub fn decode_claims(token: &Token) -> Option<Claims> {
    let payload = token.as_str().split('.').nth(1)?;
    let bytes = CLAIMS_ENGINE.decode(payload).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    Claims::from_value(value)
}

/// `true` when claims are undecodable or `exp <= now_secs`
///
/// A token expiring exactly at `now_secs` is already expired.
pub fn is_expired(token: &Token, now_secs: i64) -> bool {
    decode_claims(token).map_or(true, |claims| claims.exp <= now_secs)
}

/// `true` when `raw` normalizes and is not expired
pub fn is_usable(raw: &str, now_secs: i64) -> bool {
    usable_token(raw, now_secs).is_some()
}

/// The normalized token when `raw` is usable at `now_secs`
pub fn usable_token(raw: &str, now_secs: i64) -> Option<Token> {
    Token::parse(raw).filter(|token| !is_expired(token, now_secs))
}

/// Why a stored value is or is not usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenDiagnosis {
    /// Nothing stored, or only whitespace
    Missing,
    /// Failed normalization
    Malformed,
    /// Well-formed but the payload is not decodable claims
    Undecodable,
    Expired { exp: i64 },
    Valid { exp: i64, subject: Option<String>, roles: Vec<String> },
}

impl TokenDiagnosis {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Short label for log fields
    pub fn label(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Malformed => "malformed",
            Self::Undecodable => "undecodable",
            Self::Expired { .. } => "expired",
            Self::Valid { .. } => "valid",
        }
    }
}

/// Structured account of a stored value's usability
pub fn diagnose(raw: Option<&str>, now_secs: i64) -> TokenDiagnosis {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return TokenDiagnosis::Missing;
    };
    let Some(token) = Token::parse(raw) else {
        return TokenDiagnosis::Malformed;
    };
    let Some(claims) = decode_claims(&token) else {
        return TokenDiagnosis::Undecodable;
    };
    if claims.exp <= now_secs {
        return TokenDiagnosis::Expired { exp: claims.exp };
    }
    TokenDiagnosis::Valid { exp: claims.exp, roles: claims.roles(), subject: claims.sub }
}
