//! Status → error envelope classification
//!
//! | status | kind | message |
//! |---|---|---|
//! | 0 | `NetworkUnreachable` | fixed |
//! | 401 | `Unauthorized` | fixed |
//! | 403 | `Forbidden` | body `message`/`error`, else generic |
//! | 423 | `ResourceLocked` | body `message`/`error`, else generic |
//! | other | `HttpError` | body `message`, else `HTTP error, status <code>` |
//!
//! An empty body is never parsed. A non-JSON body is kept verbatim in
//! `data` so the caller still sees what the server said.

use serde_json::Value;

use super::{ApiError, ErrorKind};

pub const NETWORK_UNREACHABLE_MESSAGE: &str =
    "Network unreachable: the server could not be reached (connectivity or cross-origin failure)";
pub const UNAUTHORIZED_MESSAGE: &str = "401 Unauthorized: token is missing, invalid or expired";
pub const FORBIDDEN_MESSAGE: &str = "Access denied: you may not have sufficient permissions";
pub const LOCKED_MESSAGE: &str = "Resource is locked";

/// Stateless classifier for non-success responses
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Map a non-success status and its (possibly empty) body text to an
    /// [`ApiError`]
    pub fn classify(status: u16, body: &str) -> ApiError {
        classify_status(status, body)
    }
}

/// Free-function form of [`ErrorClassifier::classify`]
pub fn classify_status(status: u16, body: &str) -> ApiError {
    let data = decode_body(body);

    let error = match status {
        0 => ApiError::new(ErrorKind::NetworkUnreachable, NETWORK_UNREACHABLE_MESSAGE),
        401 => ApiError::new(ErrorKind::Unauthorized, UNAUTHORIZED_MESSAGE),
        403 => ApiError::new(
            ErrorKind::Forbidden,
            body_field(data.as_ref(), &["message", "error"]).unwrap_or(FORBIDDEN_MESSAGE),
        ),
        423 => ApiError::new(
            ErrorKind::ResourceLocked,
            body_field(data.as_ref(), &["message", "error"]).unwrap_or(LOCKED_MESSAGE),
        ),
        _ => {
            let message = body_field(data.as_ref(), &["message"])
                .map_or_else(|| format!("HTTP error, status {status}"), str::to_owned);
            ApiError::new(ErrorKind::HttpError, message)
        }
    };

    let error = if status == 0 { error } else { error.with_status(status) };
    match data {
        Some(data) => error.with_data(data),
        None => error,
    }
}

fn decode_body(body: &str) -> Option<Value> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<Value>(trimmed)
            .unwrap_or_else(|_| Value::String(trimmed.to_owned())),
    )
}

/// First non-empty string among `keys`, in order
fn body_field<'a>(data: Option<&'a Value>, keys: &[&str]) -> Option<&'a str> {
    let object = data?.as_object()?;
    keys.iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .find(|value| !value.trim().is_empty())
}
