//! DirectAdmin response normalization.
//!
//! The legacy `CMD_API_*` commands answer in whatever format the command and
//! panel version happen to use. [`classify`] looks at one response and decides
//! which of the known shapes it is, in a fixed order:
//!
//! 1. `Content-Type` containing `json` → [`ResponseShape::Json`]
//! 2. body starting with `<` → [`ResponseShape::Html`] (login or error page)
//! 3. blank body → [`ResponseShape::Empty`]
//! 4. `list[]=` segments → [`ResponseShape::UrlEncoded`] with a `list` key
//! 5. `key=value&key=value` → [`ResponseShape::UrlEncoded`]
//! 6. `key=value` lines → [`ResponseShape::LineKv`]
//! 7. one address per line → [`ResponseShape::LineList`] with a `list` key
//! 8. anything else → [`ResponseShape::Opaque`]
//!
//! Classification never decides success. A payload carrying `error=0` is a
//! success report; [`Payload::remote_error`] only reports non-zero codes.

use std::fmt;

use serde_json::Value;

/// Key DirectAdmin uses for repeated list entries.
pub const LIST_KEY: &str = "list";

/// A value in a [`Payload`]: one string, or every value of a repeated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadValue {
    Single(String),
    List(Vec<String>),
}

impl PayloadValue {
    /// Returns the first value.
    pub fn first(&self) -> Option<&str> {
        match self {
            PayloadValue::Single(v) => Some(v),
            PayloadValue::List(values) => values.first().map(String::as_str),
        }
    }

    /// Returns every value in arrival order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            PayloadValue::Single(v) => vec![v.as_str()],
            PayloadValue::List(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Returns `true` if no value carries any text.
    pub fn is_blank(&self) -> bool {
        self.values().iter().all(|v| v.trim().is_empty())
    }

    fn push(&mut self, value: String) {
        match self {
            PayloadValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = PayloadValue::List(vec![first, value]);
            }
            PayloadValue::List(values) => values.push(value),
        }
    }
}

/// A decoded DirectAdmin response body.
///
/// Keys keep their arrival order. Inserting an existing key appends to it
/// instead of overwriting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    entries: Vec<(String, PayloadValue)>,
}

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, promoting the key to a list if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.push(value),
            None => self.entries.push((key, PayloadValue::Single(value))),
        }
    }

    fn push_entry(&mut self, key: String, value: PayloadValue) {
        self.entries.push((key, value));
    }

    /// Builds a payload holding only a `list` key.
    pub fn from_list(items: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: vec![(LIST_KEY.to_string(), PayloadValue::List(items.into_iter().collect()))],
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the first value stored under `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PayloadValue::first)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PayloadValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over keys in arrival order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the payload has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the raw `error` code, if DirectAdmin sent one.
    pub fn error_code(&self) -> Option<&str> {
        self.get_str("error").map(str::trim)
    }

    /// Returns the error DirectAdmin reported, if any.
    ///
    /// `error=0` is DirectAdmin's success code and yields `None`, as does a
    /// payload without an `error` key.
    pub fn remote_error(&self) -> Option<RemoteError> {
        let code = self.error_code()?;
        if code == "0" {
            return None;
        }

        Some(RemoteError {
            code: code.to_string(),
            text: self.non_empty("text"),
            details: self.non_empty("details"),
        })
    }

    /// Returns `true` if any key or value mentions an error besides `error=0`.
    pub fn has_error_indicators(&self) -> bool {
        if self.remote_error().is_some() {
            return true;
        }
        self.iter().any(|(k, v)| {
            k != "error"
                && (k.to_ascii_lowercase().contains("error")
                    || v.values().iter().any(|s| s.to_ascii_lowercase().contains("error")))
        })
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.get_str(key)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// A non-zero `error` code together with DirectAdmin's explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// The `error` value.
    pub code: String,
    /// The `text` value, percent-decoded.
    pub text: Option<String>,
    /// The `details` value, percent-decoded.
    pub details: Option<String>,
}

impl RemoteError {
    /// Returns `text: details`, or whichever of the two is present.
    pub fn summary(&self) -> Option<String> {
        match (&self.text, &self.details) {
            (Some(text), Some(details)) => Some(format!("{}: {}", text, details)),
            (Some(text), None) => Some(text.clone()),
            (None, Some(details)) => Some(details.clone()),
            (None, None) => None,
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.summary() {
            Some(summary) => write!(f, "DirectAdmin error {}: {}", self.code, summary),
            None => write!(f, "DirectAdmin error {}", self.code),
        }
    }
}

impl std::error::Error for RemoteError {}

/// The shape a DirectAdmin response body was recognized as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// A JSON document, flattened into a payload.
    Json(Payload),
    /// `key=value&key=value`, including `list[]=` lists.
    UrlEncoded(Payload),
    /// One `key=value` per line, not percent-encoded.
    LineKv(Payload),
    /// One address per line, under the `list` key.
    LineList(Payload),
    /// An HTML page instead of API data.
    Html,
    /// A body with nothing but whitespace.
    Empty,
    /// Text matching none of the known shapes, trimmed.
    Opaque(String),
}

impl ResponseShape {
    /// Returns the decoded payload for the key/value shapes.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            ResponseShape::Json(p)
            | ResponseShape::UrlEncoded(p)
            | ResponseShape::LineKv(p)
            | ResponseShape::LineList(p) => Some(p),
            ResponseShape::Html | ResponseShape::Empty | ResponseShape::Opaque(_) => None,
        }
    }

    /// Short name of the shape for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseShape::Json(_) => "json",
            ResponseShape::UrlEncoded(_) => "url-encoded",
            ResponseShape::LineKv(_) => "line key/value",
            ResponseShape::LineList(_) => "line list",
            ResponseShape::Html => "html",
            ResponseShape::Empty => "empty",
            ResponseShape::Opaque(_) => "opaque",
        }
    }
}

/// Classifies a response body.
///
/// A body announced as JSON that fails to decode is classified from its text
/// instead, so an HTML error page served with a JSON content type is still
/// recognized as HTML.
pub fn classify(content_type: Option<&str>, body: &str) -> ResponseShape {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json")) {
        if let Some(payload) = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(payload_from_json)
        {
            return ResponseShape::Json(payload);
        }
    }

    let text = body.trim();

    if text.starts_with('<') {
        return ResponseShape::Html;
    }

    if text.is_empty() {
        return ResponseShape::Empty;
    }

    if text.contains("list[]=") {
        let items = text
            .split('&')
            .filter_map(|part| part.strip_prefix("list[]="))
            .map(percent_decode);
        return ResponseShape::UrlEncoded(Payload::from_list(items));
    }

    if text.contains('=') && (!text.contains('\n') || text.contains('&')) {
        return ResponseShape::UrlEncoded(parse_url_encoded(text));
    }

    if text.contains('=') {
        return ResponseShape::LineKv(parse_lines(text));
    }

    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.iter().all(|l| l.contains('@')) {
        return ResponseShape::LineList(Payload::from_list(
            lines.into_iter().map(str::to_string),
        ));
    }

    ResponseShape::Opaque(text.to_string())
}

/// Decodes `%XX` escapes once. Invalid UTF-8 is replaced, never rejected.
pub fn percent_decode(s: &str) -> String {
    match urlencoding::decode(s) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(s.as_bytes())).into_owned(),
    }
}

fn parse_url_encoded(text: &str) -> Payload {
    let mut payload = Payload::new();
    for pair in text.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = percent_decode(key.trim());
        if key.is_empty() {
            continue;
        }
        payload.insert(key, percent_decode(value.trim()));
    }
    payload
}

fn parse_lines(text: &str) -> Payload {
    let mut payload = Payload::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        payload.insert(key, value.trim());
    }
    payload
}

fn payload_from_json(value: Value) -> Option<Payload> {
    match value {
        Value::Object(map) => {
            let mut payload = Payload::new();
            for (key, value) in map {
                payload.push_entry(key, json_value(value));
            }
            Some(payload)
        }
        Value::Array(items) => Some(Payload::from_list(items.into_iter().map(json_scalar))),
        _ => None,
    }
}

fn json_value(value: Value) -> PayloadValue {
    match value {
        Value::Array(items) => PayloadValue::List(items.into_iter().map(json_scalar).collect()),
        other => PayloadValue::Single(json_scalar(other)),
    }
}

fn json_scalar(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
