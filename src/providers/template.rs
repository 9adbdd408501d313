//! Request body templates with a `{{message}}` placeholder.
//!
//! Templates are stored as the JSON text the user edits, parsed once, and
//! rendered by substituting the message into string leaves of the parsed
//! tree. Quotes and newlines in the message can never corrupt the body.

use serde_json::Value;
use thiserror::Error;

/// Placeholder replaced by the outgoing user message.
pub const MESSAGE_PLACEHOLDER: &str = "{{message}}";

/// Errors from parsing a template string.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,
    #[error("template is not valid JSON: {0}")]
    InvalidJson(String),
}

/// A request body template, parsed once and rendered per send.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BodyTemplate {
    raw: String,
    parsed: Value,
}

impl BodyTemplate {
    /// Parse the JSON text of a template.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        if raw.trim().is_empty() {
            return Err(TemplateError::Empty);
        }
        let parsed: Value =
            serde_json::from_str(raw).map_err(|e| TemplateError::InvalidJson(e.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            parsed,
        })
    }

    /// The editable template text exactly as entered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether any string leaf carries the message placeholder.
    pub fn has_placeholder(&self) -> bool {
        value_has_placeholder(&self.parsed)
    }

    /// Produce the request body for `message`.
    ///
    /// Every occurrence of the placeholder in every string leaf is replaced
    /// with the literal message text. Keys and non-string values pass
    /// through untouched.
    pub fn render(&self, message: &str) -> Value {
        substitute(&self.parsed, message)
    }
}

fn substitute(value: &Value, message: &str) -> Value {
    match value {
        Value::String(s) if s.contains(MESSAGE_PLACEHOLDER) => {
            Value::String(s.replace(MESSAGE_PLACEHOLDER, message))
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, message)).collect()),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), substitute(v, message)))
            .collect(),
        other => other.clone(),
    }
}

fn value_has_placeholder(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains(MESSAGE_PLACEHOLDER),
        Value::Array(items) => items.iter().any(value_has_placeholder),
        Value::Object(map) => map.values().any(value_has_placeholder),
        _ => false,
    }
}

impl std::fmt::Display for BodyTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for BodyTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BodyTemplate {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BodyTemplate> for String {
    fn from(template: BodyTemplate) -> Self {
        template.raw
    }
}
