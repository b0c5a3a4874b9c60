//! Error types for the stdio bridge

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge is already running")]
    AlreadyRunning,

    #[error("MCP server unreachable at {url}: {cause}")]
    ServerUnreachable { url: String, cause: String },

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("No valid data found in SSE stream")]
    NoStreamData,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
