//! Best-effort decoding of values that may be JSON-encoded text.
//!
//! Gateway error bodies are sometimes stringified once by the backend and once
//! more by the proxy in front of it. `deep_parse` peels one layer and
//! `deep_parse_bounded` peels a fixed number of layers, so the unwrap depth is
//! always chosen by the caller.

use serde_json::Value;

/// Layers unwrapped for health-check error payloads
pub const MAX_UNWRAP_DEPTH: usize = 2;

/// Decode one layer of JSON text.
///
/// Non-text values are returned as is. Text that is not valid JSON is returned
/// unchanged; a failed decode is a normal outcome here, not an error.
pub fn deep_parse(value: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(decoded) => decoded,
            Err(_) => Value::String(text),
        },
        other => other,
    }
}

/// Apply `deep_parse` until the value is no longer text, at most `max_depth` times
pub fn deep_parse_bounded(mut value: Value, max_depth: usize) -> Value {
    for _ in 0..max_depth {
        if !value.is_string() {
            break;
        }
        let decoded = deep_parse(value.clone());
        if decoded == value {
            break;
        }
        value = decoded;
    }
    value
}
