//! Session state published to subscribers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User record as returned by the backend
///
/// The backend does not commit to a fixed user shape, so the record keeps
/// the raw JSON object and exposes accessors for the fields the client
/// itself relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(Map<String, Value>);

impl UserRecord {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Minimal record carrying only an email address
    #[must_use]
    pub fn from_email(email: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("email".to_owned(), Value::String(email.into()));
        Self(fields)
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Snapshot handed to session subscribers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<UserRecord>,
}

impl Session {
    #[must_use]
    pub fn authenticated(user: UserRecord) -> Self {
        Self { is_authenticated: true, user: Some(user) }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}
