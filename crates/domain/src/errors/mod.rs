//! Error types used throughout the client
//!
//! Every failure handed to a collaborator is an [`ApiError`]: a normalized
//! envelope carrying an [`ErrorKind`], the HTTP status when one exists, a
//! human-readable message and the decoded error body. The kind is set once,
//! at the boundary where the failure is observed, so no caller ever has to
//! inspect the message text to decide what happened.

pub mod classifier;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use classifier::{classify_status, ErrorClassifier};

use crate::impl_domain_label_conversions;

/// Failure taxonomy for API calls and session operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Stored or received token is structurally invalid
    MalformedToken,
    /// Token claims are past their `exp`
    ExpiredToken,
    /// Exchanging the refresh credential failed; the session was cleared
    RefreshFailed,
    /// Backend answered 401 (absorbed by the refresh flow)
    Unauthorized,
    /// Backend answered 403
    Forbidden,
    /// Backend answered 423
    ResourceLocked,
    /// Any other non-2xx status
    HttpError,
    /// No response at all (connect failure, cross-origin rejection, status 0)
    NetworkUnreachable,
    /// A body could not be turned into the requested type
    ParseError,
    /// The per-request deadline elapsed
    Timeout,
    /// The caller cancelled the request
    Cancelled,
    /// The request could not be built (bad endpoint, unserializable body)
    InvalidRequest,
    /// The token store failed
    Storage,
    /// Configuration is missing or invalid
    Config,
}

impl_domain_label_conversions!(ErrorKind {
    MalformedToken => "malformed_token",
    ExpiredToken => "expired_token",
    RefreshFailed => "refresh_failed",
    Unauthorized => "unauthorized",
    Forbidden => "forbidden",
    ResourceLocked => "resource_locked",
    HttpError => "http_error",
    NetworkUnreachable => "network_unreachable",
    ParseError => "parse_error",
    Timeout => "timeout",
    Cancelled => "cancelled",
    InvalidRequest => "invalid_request",
    Storage => "storage",
    Config => "config",
});

/// Normalized error envelope `{ kind, status?, message, data? }`
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, status: None, message: message.into(), data: None }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedToken, message)
    }

    pub fn expired_token() -> Self {
        Self::new(ErrorKind::ExpiredToken, "Token has expired")
    }

    pub fn refresh_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RefreshFailed, message)
    }

    pub fn network_unreachable(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkUnreachable, detail)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(ErrorKind::Timeout, format!("Request timed out after {after:?}"))
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "Request was cancelled")
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// `true` for failures that end or threaten the session
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::Unauthorized | ErrorKind::RefreshFailed)
    }

    /// `true` when repeating the identical request may succeed
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::NetworkUnreachable | ErrorKind::Timeout => true,
            ErrorKind::HttpError => self.status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }

    /// Stable label suitable for log fields
    pub fn label(&self) -> String {
        self.kind.to_string()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(format!("Unexpected response shape: {err}"))
    }
}
