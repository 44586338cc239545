//! Normalization of cache health-check results.
//!
//! The gateway's cache ping either answers with a status payload or fails with
//! an error whose message is often a JSON document, sometimes stringified
//! twice on its way through a proxy. Everything here reduces those shapes to a
//! single [`HealthCheckResult`] that the display layer can render without
//! further inspection.

use crate::deep_parse::{MAX_UNWRAP_DEPTH, deep_parse, deep_parse_bounded};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";

/// What came back from invoking the health check
#[derive(Debug, Clone, PartialEq)]
pub enum HealthCheckOutcome {
    /// The call resolved with a payload (which may still describe an error)
    Response(Value),
    /// The call failed; `message` is the error text as raised
    Thrown { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckSuccess {
    pub status: String,
    #[serde(rename = "cacheType")]
    pub cache_type: String,
    #[serde(rename = "pingResponse")]
    pub ping_response: bool,
    #[serde(rename = "setCacheResponse")]
    pub set_cache_response: String,
    #[serde(rename = "cacheParams", skip_serializing_if = "Option::is_none")]
    pub cache_params: Option<Value>,
    #[serde(
        rename = "healthCheckCacheParams",
        skip_serializing_if = "Option::is_none"
    )]
    pub health_check_cache_params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckFailure {
    pub message: String,
    /// Every other field of the error body, stringified, in original order
    pub extra: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum HealthCheckResult {
    Success(HealthCheckSuccess),
    Failure(HealthCheckFailure),
}

impl HealthCheckResult {
    pub fn is_success(&self) -> bool {
        matches!(self, HealthCheckResult::Success(_))
    }
}

/// Reduce a health-check outcome to its canonical shape. Never fails.
pub fn normalize(outcome: HealthCheckOutcome) -> HealthCheckResult {
    match outcome {
        HealthCheckOutcome::Response(body) => match deep_parse(body) {
            Value::Object(mut body) => match take_error(&mut body) {
                Some(error_payload) => HealthCheckResult::Failure(failure_from(error_payload)),
                None => HealthCheckResult::Success(success_from(&body)),
            },
            other => HealthCheckResult::Failure(failure_from(other)),
        },
        HealthCheckOutcome::Thrown { message } => {
            HealthCheckResult::Failure(failure_from(thrown_error_data(message)))
        }
    }
}

/// Remove and return the `error` member when it carries something.
/// `null`, `false` and `""` leave the object untouched.
fn take_error(body: &mut Map<String, Value>) -> Option<Value> {
    let carries_error = match body.get("error") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    };
    if carries_error {
        body.remove("error")
    } else {
        None
    }
}

fn success_from(body: &Map<String, Value>) -> HealthCheckSuccess {
    HealthCheckSuccess {
        status: field_text(body, "status"),
        cache_type: field_text(body, "cache_type"),
        ping_response: body
            .get("ping_response")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        set_cache_response: field_text(body, "set_cache_response"),
        cache_params: parsed_field(body, "litellm_cache_params"),
        health_check_cache_params: parsed_field(body, "health_check_cache_params"),
    }
}

/// Error data carried by a thrown error's message.
///
/// A JSON message with a non-empty `error` member is unwrapped to that member; any
/// other JSON object is used as is; anything else becomes `{message: text}`.
fn thrown_error_data(message: String) -> Value {
    if message.is_empty() {
        return message_object(UNKNOWN_ERROR_MESSAGE.to_string());
    }

    match serde_json::from_str::<Value>(&message) {
        Ok(Value::Object(mut decoded)) => match take_error(&mut decoded) {
            Some(inner) => inner,
            None => Value::Object(decoded),
        },
        _ => message_object(message),
    }
}

fn failure_from(error_payload: Value) -> HealthCheckFailure {
    let mut error_data = as_error_object(deep_parse(error_payload));

    // One layer is already decoded; the message may carry the remaining ones.
    if let Some(Value::String(message)) = error_data.get("message") {
        let inner = deep_parse_bounded(Value::String(message.clone()), MAX_UNWRAP_DEPTH - 1);
        if let Value::Object(inner) = inner {
            error_data = inner;
        }
    }

    let message = error_data
        .shift_remove("message")
        .map(value_text)
        .unwrap_or_default();
    let extra = error_data
        .into_iter()
        .map(|(key, value)| (key, value_text(value)))
        .collect();

    HealthCheckFailure { message, extra }
}

fn as_error_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => match message_object(value_text(other)) {
            Value::Object(map) => map,
            _ => Map::new(),
        },
    }
}

fn message_object(message: String) -> Value {
    let mut map = Map::new();
    map.insert("message".to_string(), Value::String(message));
    Value::Object(map)
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn field_text(body: &Map<String, Value>, key: &str) -> String {
    match body.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(value) => value_text(value.clone()),
    }
}

fn parsed_field(body: &Map<String, Value>, key: &str) -> Option<Value> {
    match body.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(deep_parse(value.clone())),
    }
}
