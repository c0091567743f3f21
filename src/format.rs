// Response formatting for display

use crate::dispatch::SimulatedResponse;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

const DEFAULT_MESSAGE: &str = "success";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub code: u16,
    pub text: String,
}

/// A simulated response, normalized for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedResult {
    /// Pretty JSON object of lower-cased header name to its values.
    pub headers: String,
    /// Pretty JSON array of the cookies the response set.
    pub cookies: String,
    /// Pretty JSON when the body parses, the raw body otherwise.
    pub content: String,
    /// Highlighting hint: `html` or `json`.
    pub language: &'static str,
    pub message: String,
    pub status: StatusLine,
}

pub fn format(response: &SimulatedResponse) -> FormattedResult {
    let parsed = serde_json::from_slice::<Value>(&response.raw_body).ok();

    let content = match &parsed {
        Some(body) => pretty_json(body),
        None => response.body_string(),
    };

    let language = match &response.content_type {
        Some(content_type) if content_type.to_lowercase().contains("html") => "html",
        _ => "json",
    };

    let cookies = serde_json::to_value(response.cookies()).unwrap_or_else(|_| Value::Array(Vec::new()));

    FormattedResult {
        headers: pretty_json(&header_object(response)),
        cookies: pretty_json(&cookies),
        content,
        language,
        message: message(parsed.as_ref()),
        status: StatusLine {
            code: response.status_code,
            text: response.status_text.clone(),
        },
    }
}

/// Four-space indented JSON, keys in their original order.
pub fn pretty_json(value: &Value) -> String {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => value.to_string(),
    }
}

fn header_object(response: &SimulatedResponse) -> Value {
    let mut headers = Map::new();
    for (name, value) in response.headers.iter() {
        let values = headers
            .entry(name.to_lowercase())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(values) = values {
            values.push(Value::String(value.clone()));
        }
    }
    Value::Object(headers)
}

fn message(body: Option<&Value>) -> String {
    let text = match body.and_then(|body| body.get("message")) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    };

    if text.is_empty() {
        DEFAULT_MESSAGE.to_string()
    } else {
        text
    }
}
