//! Decoding of `text/event-stream` response bodies.
//!
//! A streamable HTTP server may answer a POST with an SSE stream instead of a
//! plain JSON body. The bridge needs exactly one JSON-RPC message per request,
//! so the first `data:` payload that parses as JSON wins and the rest of the
//! stream is ignored.

use crate::error::{BridgeError, Result};
use serde_json::Value;
use tracing::{debug, warn};

const DATA_PREFIX: &str = "data: ";

/// Returns the first `data: ` payload in `body` that is valid JSON.
///
/// Payloads that fail to parse are logged and skipped. Fails with
/// [`BridgeError::NoStreamData`] when nothing usable is found.
pub fn decode_first_data(body: &str) -> Result<Value> {
    for line in body.lines() {
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("Failed to parse SSE data payload: {}", e);
                debug!("Invalid SSE data: {}", payload);
            }
        }
    }
    Err(BridgeError::NoStreamData)
}

/// True when a `Content-Type` header value denotes an SSE body.
pub fn is_event_stream(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/event-stream"))
}
