//! Success body parsing
//!
//! Structured bodies go through three tiers before giving up:
//!
//! 1. strict JSON parse of the whole body
//! 2. salvage: the first balanced top-level `[...]` span, found by a
//!    string-aware scan, parsed as a JSON array
//! 3. salvage: the crude slice from the first `[` to the last `]`
//!
//! When every tier fails the trimmed text is returned as-is. That is a
//! degraded success, not an error: some backends wrap an otherwise valid
//! array in log noise.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// How a body was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyOutcome {
    /// Decoded as declared (or empty)
    Parsed,
    /// Recovered from a malformed structured body
    Salvaged,
    /// Structured body that could not be recovered; raw text returned
    Raw,
}

impl BodyOutcome {
    pub fn is_degraded(self) -> bool {
        !matches!(self, Self::Parsed)
    }
}

/// Decoded success body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn empty_object() -> Self {
        Self::Json(Value::Object(Map::new()))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// JSON view of the body; text becomes a JSON string
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }

    /// Deserialize into `T`
    ///
    /// # Errors
    /// Fails when the body does not have the shape of `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.into_value())
    }
}

/// Body plus how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBody {
    pub body: ResponseBody,
    pub outcome: BodyOutcome,
}

impl ParsedBody {
    fn parsed(body: ResponseBody) -> Self {
        Self { body, outcome: BodyOutcome::Parsed }
    }
}

/// Stateless success body parser
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    /// Decode a success body according to its declared content type
    pub fn parse(status: u16, content_type: Option<&str>, body: &str) -> ParsedBody {
        let structured = is_structured_content_type(content_type);
        let no_content = matches!(status, 204 | 205);

        if !structured {
            let text = if no_content { String::new() } else { body.to_owned() };
            return ParsedBody::parsed(ResponseBody::Text(text));
        }

        let trimmed = body.trim();
        if no_content || trimmed.is_empty() {
            return ParsedBody::parsed(ResponseBody::empty_object());
        }

        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return ParsedBody::parsed(ResponseBody::Json(value));
        }

        match salvage(trimmed) {
            Some(value) => {
                ParsedBody { body: ResponseBody::Json(value), outcome: BodyOutcome::Salvaged }
            }
            None => {
                ParsedBody { body: ResponseBody::Text(trimmed.to_owned()), outcome: BodyOutcome::Raw }
            }
        }
    }
}

/// `application/json` or any `+json` media type; parameters are ignored
pub fn is_structured_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let media_type = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    media_type == "application/json" || media_type.ends_with("+json")
}

fn salvage(text: &str) -> Option<Value> {
    balanced_array_span(text)
        .and_then(parse_array)
        .or_else(|| crude_array_span(text).and_then(parse_array))
}

fn parse_array(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate).ok().filter(Value::is_array)
}

/// First top-level `[...]` span whose brackets balance
///
/// The scan tracks string state: brackets inside `"..."` are ignored and the
/// character after a `\` inside a string is skipped.
pub fn balanced_array_span(text: &str) -> Option<&str> {
    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut start = None;

    for (offset, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'[' => {
                if depth == 0 {
                    start = Some(offset);
                }
                depth += 1;
            }
            b']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|begin| &text[begin..=offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn crude_array_span(text: &str) -> Option<&str> {
    let begin = text.find('[')?;
    let end = text.rfind(']')?;
    (end > begin).then(|| &text[begin..=end])
}
