//! Decoded token payload and role lookup

use serde::Serialize;
use serde_json::{Map, Value};

/// Claim names consulted for roles, highest priority first
///
/// The first key present wins, even when its value is empty; lower-priority
/// keys are never merged in.
pub const ROLE_CLAIM_PRECEDENCE: [&str; 4] = ["authorities", "roles", "role", "scope"];

const ROLE_PREFIX: &str = "ROLE_";

/// Token payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    /// Expiry, Unix seconds
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Every other claim, untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Build from a decoded payload; `None` without a numeric `exp`
    ///
    /// Fractional `exp` values are truncated to whole seconds.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut extra) = value else {
            return None;
        };
        let exp = match extra.remove("exp")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
            _ => return None,
        };
        let sub = match extra.remove("sub") {
            Some(Value::String(sub)) => Some(sub),
            _ => None,
        };
        Some(Self { exp, sub, extra })
    }

    /// Roles granted by the token, per [`ROLE_CLAIM_PRECEDENCE`]
    ///
    /// Array elements may be strings or objects carrying an `authority` (or
    /// `name`) string; anything else is skipped. `scope` is split on
    /// whitespace.
    pub fn roles(&self) -> Vec<String> {
        ROLE_CLAIM_PRECEDENCE
            .iter()
            .find_map(|key| self.extra.get(*key).map(|value| roles_from(key, value)))
            .unwrap_or_default()
    }

    /// `true` when `role` or `ROLE_<role>` is granted
    pub fn has_role(&self, role: &str) -> bool {
        let prefixed = format!("{ROLE_PREFIX}{role}");
        self.roles().iter().any(|granted| granted == role || *granted == prefixed)
    }
}

fn roles_from(key: &str, value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(role_name).collect(),
        Value::String(s) if key == "scope" => s.split_whitespace().map(str::to_owned).collect(),
        other => role_name(other).into_iter().collect(),
    }
}

fn role_name(value: &Value) -> Option<String> {
    let name = match value {
        Value::String(s) => s.as_str(),
        Value::Object(fields) => fields
            .get("authority")
            .or_else(|| fields.get("name"))
            .and_then(Value::as_str)?,
        _ => return None,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}
