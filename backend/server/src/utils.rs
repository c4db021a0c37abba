use axum::{
    body::Bytes,
    http::{HeaderMap, header::CONTENT_TYPE},
};
use serde_json::{Map, Value, map::Entry};

use crate::error::AppError::{self, EmptyForm};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Decodes a submission body into its field map.
///
/// Urlencoded bodies are read as flat string fields, repeated keys collect into an array.
/// JSON bodies must be an object. Any other content type, a missing one, nothing usable, or
/// an empty object, is an [`EmptyForm`].
pub fn parse_form(headers: &HeaderMap, body: &Bytes) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(EmptyForm);
    }

    let fields = match mime(headers).as_deref() {
        Some(FORM_URLENCODED) => parse_urlencoded(body)?,
        Some(mime) if is_json(mime) => {
            match serde_json::from_slice::<Value>(body).map_err(|_| EmptyForm)? {
                Value::Object(map) => map,
                _ => return Err(EmptyForm),
            }
        }
        _ => return Err(EmptyForm),
    };

    if fields.is_empty() {
        return Err(EmptyForm);
    }

    Ok(fields)
}

/// Lowercased essence of the `Content-Type`, parameters dropped.
fn mime(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().to_ascii_lowercase())
}

fn is_json(mime: &str) -> bool {
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn parse_urlencoded(body: &Bytes) -> Result<Map<String, Value>, AppError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body).map_err(|_| EmptyForm)?;
    let mut fields = Map::new();

    for (key, value) in pairs {
        match fields.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(Value::String(value));
            }
            Entry::Occupied(mut entry) => match entry.get_mut() {
                Value::Array(values) => values.push(Value::String(value)),
                first => {
                    let previous = first.take();
                    *first = Value::Array(vec![previous, Value::String(value)]);
                }
            },
        }
    }

    Ok(fields)
}

/// Text shown for a field in the notification, `-` when it is missing or falsy.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => "-".to_string(),
        Some(Value::String(s)) if s.is_empty() => "-".to_string(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }

    out
}
