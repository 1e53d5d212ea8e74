//! Articles as returned by the Forem `articles/me` endpoint.
//!
//! The list envelope is decoded up front; each element is kept as raw JSON
//! so that one malformed article can be skipped without rejecting the rest.

use serde::Serialize;
use serde_json::Value;

use blogsync_core::Error;

/// One article from a remote list, validated field by field on access.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExternalArticle(Value);

impl ExternalArticle {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Stable identifier of the article (its slug).
    pub fn identifier(&self) -> Result<&str, Error> {
        self.required_str("slug")
    }

    pub fn title(&self) -> Result<&str, Error> {
        self.required_str("title")
    }

    /// Markdown source of the article.
    pub fn body(&self) -> Result<&str, Error> {
        self.required_str("body_markdown")
    }

    /// Short summary, if the author wrote one.
    pub fn description(&self) -> Option<&str> {
        self.0
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn published_at(&self) -> Option<&str> {
        self.0.get("published_at").and_then(Value::as_str)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    fn required_str(&self, field: &str) -> Result<&str, Error> {
        let object = self
            .0
            .as_object()
            .ok_or_else(|| Error::Decode(format!("article is not an object: {}", kind(&self.0))))?;
        match object.get(field) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(Error::Decode(format!("article field `{field}` must be a string, got {}", kind(other)))),
            None => Err(Error::Decode(format!("article field `{field}` is missing"))),
        }
    }
}

impl From<Value> for ExternalArticle {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
