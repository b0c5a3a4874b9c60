//! JSON-RPC envelope helpers.
//!
//! The bridge forwards envelopes without interpreting them. The only fields it
//! looks at are `id` (echoed back in locally built errors) and `method` (logging).

use serde_json::Value;

/// Invalid JSON was received.
pub const PARSE_ERROR: i32 = -32700;

/// Internal error; used for every forwarding failure.
pub const INTERNAL_ERROR: i32 = -32603;

/// Build a JSON-RPC error response.
pub fn error_response(id: Value, code: i32, message: &str) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Response for an input line that is not valid JSON.
pub fn parse_error_response() -> Value {
    error_response(Value::Null, PARSE_ERROR, "Parse error")
}

/// Response for a request whose forwarding failed.
pub fn bridge_error_response(request: &Value, cause: &str) -> Value {
    error_response(
        request_id(request),
        INTERNAL_ERROR,
        &format!("Bridge error: {}", cause),
    )
}

/// The request's `id`, or `null` for notifications and non-object envelopes.
pub fn request_id(envelope: &Value) -> Value {
    envelope.get("id").cloned().unwrap_or(Value::Null)
}

pub fn method(envelope: &Value) -> Option<&str> {
    envelope.get("method").and_then(Value::as_str)
}
