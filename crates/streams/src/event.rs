//! Events produced by a stream source for one poll.

use serde_json::Value;

/// One new item reported by an event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Plain text, delivered as-is after the stream prefix.
    Text(String),
    /// Record with optional headline, detail line, and link.
    Structured {
        message: Option<String>,
        details: Option<String>,
        url: Option<String>,
    },
    /// Anything else, carried as its textual representation.
    Other(String),
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[must_use]
    pub fn structured(message: Option<&str>, details: Option<&str>, url: Option<&str>) -> Self {
        Self::Structured {
            message: message.map(str::to_string),
            details: details.map(str::to_string),
            url: url.map(str::to_string),
        }
    }
}

impl From<&str> for Event {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Event {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for Event {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(map) => {
                let field = |primary: &str, fallback: Option<&str>| {
                    field_text(map.get(primary))
                        .or_else(|| fallback.and_then(|key| field_text(map.get(key))))
                };
                Self::Structured {
                    message: field("message", Some("title")),
                    details: field("details", Some("body")),
                    url: field("url", None),
                }
            },
            other => Self::Other(other.to_string()),
        }
    }
}

/// Falsy JSON (null, `false`, zero, empty string/array/object) counts as
/// absent so the next field in the fallback chain is used. Other values use
/// their JSON text.
fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
