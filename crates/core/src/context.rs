//! Structured context attached to a log entry, and `{placeholder}`
//! interpolation of that context into the message text.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Context key that overrides the owning add-on of a single entry.
pub const ADDON_ID_KEY: &str = "addon_id";

/// Context key under which an error's description is recorded.
pub const EXCEPTION_KEY: &str = "exception";

// ---------------------------------------------------------------------------
// LogContext
// ---------------------------------------------------------------------------

/// Key/value data passed alongside a log message.
///
/// Everything except [`ADDON_ID_KEY`] ends up in the entry's `details`
/// payload. Scalar values are also available for message interpolation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogContext(Map<String, Value>);

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a JSON-convertible value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert any serializable value. Values that fail to serialize are
    /// recorded as `null`.
    pub fn with_json<T: Serialize + ?Sized>(mut self, key: impl Into<String>, value: &T) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.0.insert(key.into(), value);
        self
    }

    /// Insert a value through its `Display` implementation, making it
    /// available for interpolation.
    pub fn with_display(mut self, key: impl Into<String>, value: &impl Display) -> Self {
        self.0.insert(key.into(), Value::String(value.to_string()));
        self
    }

    /// Attribute this entry to a specific add-on.
    pub fn with_addon_id(self, addon_id: impl Into<String>) -> Self {
        self.with(ADDON_ID_KEY, addon_id.into())
    }

    /// Record an error (type, message and source chain) under
    /// [`EXCEPTION_KEY`].
    pub fn with_error<E>(mut self, err: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let mut sources = Vec::new();
        let mut source = err.source();
        while let Some(inner) = source {
            sources.push(Value::String(inner.to_string()));
            source = inner.source();
        }

        let mut exception = match self.0.remove(EXCEPTION_KEY) {
            Some(Value::Object(existing)) => existing,
            _ => Map::new(),
        };
        exception.insert("class".into(), Value::String(std::any::type_name::<E>().into()));
        exception.insert("message".into(), Value::String(err.to_string()));
        exception.insert("sources".into(), Value::Array(sources));

        self.0.insert(EXCEPTION_KEY.into(), Value::Object(exception));
        self
    }

    /// The add-on override, when present and a string.
    pub fn addon_id(&self) -> Option<&str> {
        self.0.get(ADDON_ID_KEY).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The `details` payload: the context without the add-on override, or
    /// `None` when nothing is left.
    pub fn details(&self) -> Option<Value> {
        let details: Map<String, Value> = self
            .0
            .iter()
            .filter(|(key, _)| key.as_str() != ADDON_ID_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        if details.is_empty() {
            None
        } else {
            Some(Value::Object(details))
        }
    }
}

impl From<Map<String, Value>> for LogContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// Interpolation
// ---------------------------------------------------------------------------

/// String form of a context value, when it has one.
///
/// Arrays and objects have no string form and are never substituted.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Replace `{key}` placeholders with scalar context values.
///
/// Single pass: substituted text is not scanned again. Placeholders with no
/// matching key, or whose value is an array or object, are left as-is.
pub fn interpolate(message: &str, context: &LogContext) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replacement = after.find('}').and_then(|close| {
            context
                .get(&after[..close])
                .and_then(scalar_text)
                .map(|text| (text, close))
        });

        match replacement {
            Some((text, close)) => {
                out.push_str(&text);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
