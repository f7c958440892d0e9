//! Recover JSON from model output that may wrap it in prose or code fences.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static OBJECT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("object span pattern is valid"));
static ARRAY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("array span pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Parsed(Value),
    Unparseable,
}

impl ParsedResponse {
    pub fn into_object(self) -> Option<serde_json::Map<String, Value>> {
        match self {
            ParsedResponse::Parsed(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            ParsedResponse::Parsed(Value::Array(items)) => Some(items),
            _ => None,
        }
    }
}

fn parse_span(pattern: &Regex, text: &str) -> Option<Value> {
    let span = pattern.find(text)?;
    serde_json::from_str(span.as_str()).ok()
}

/// Strict parse first; then the widest `{...}` span; then the widest `[...]` span.
pub fn recover_json(text: &str) -> ParsedResponse {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return ParsedResponse::Parsed(value);
    }

    parse_span(&OBJECT_SPAN, trimmed)
        .or_else(|| parse_span(&ARRAY_SPAN, trimmed))
        .map(ParsedResponse::Parsed)
        .unwrap_or(ParsedResponse::Unparseable)
}
