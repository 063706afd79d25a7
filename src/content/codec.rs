use serde_json::{Map, Value};

use super::{BodyFormat, ContentType};
use crate::errors::DispatchError;

/// Serialize a handler's return value as `content_type`.
///
/// `Null` encodes to an empty body for every type. Text-like types only
/// accept strings: structured data is never stringified implicitly. JSON
/// passes strings through untouched but still requires them to be valid JSON.
///
/// # Errors
///
/// [`DispatchError::Serialization`] when the value cannot be represented.
pub fn encode(content_type: ContentType, value: &Value) -> Result<Vec<u8>, DispatchError> {
    let fail = |reason: String| DispatchError::Serialization {
        content_type: content_type.mime(),
        reason,
    };

    match (content_type, value) {
        (_, Value::Null) => Ok(Vec::new()),
        (ContentType::Json, Value::String(s)) => {
            serde_json::from_str::<serde::de::IgnoredAny>(s)
                .map_err(|e| fail(format!("string is not valid JSON: {e}")))?;
            Ok(s.as_bytes().to_vec())
        }
        (ContentType::Json, other) => serde_json::to_vec(other).map_err(|e| fail(e.to_string())),
        (_, Value::String(s)) => Ok(s.as_bytes().to_vec()),
        (_, other) => Err(fail(format!(
            "refusing to stringify {}",
            value_kind(other)
        ))),
    }
}

/// Decode a request body into a parameter map.
///
/// An empty (or whitespace-only) body decodes to an empty map for both formats.
///
/// # Errors
///
/// [`DispatchError::Decode`] for malformed JSON, JSON that is not an object,
/// or a form body that is not UTF-8.
pub fn decode(format: BodyFormat, body: &[u8]) -> Result<Map<String, Value>, DispatchError> {
    let fail = |reason: String| DispatchError::Decode {
        format: format.as_str(),
        reason,
    };

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match format {
        BodyFormat::Json => match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(fail(format!(
                "expected a JSON object, got {}",
                value_kind(&other)
            ))),
            Err(e) => Err(fail(e.to_string())),
        },
        BodyFormat::Form => {
            let text = std::str::from_utf8(body).map_err(|e| fail(e.to_string()))?;
            // A JSON document sent as form data contributes nothing.
            if serde_json::from_str::<serde::de::IgnoredAny>(text).is_ok() {
                return Ok(Map::new());
            }
            Ok(decode_form(text))
        }
    }
}

/// Decode `key=value` pairs. Segments without `=` carry no pair and are
/// skipped; there is no fallback to any other format.
fn decode_form(text: &str) -> Map<String, Value> {
    let mut params = Map::new();
    for segment in text.trim().split('&').filter(|s| s.contains('=')) {
        for (key, value) in url::form_urlencoded::parse(segment.as_bytes()) {
            params.insert(key.into_owned(), Value::String(value.into_owned()));
        }
    }
    params
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
