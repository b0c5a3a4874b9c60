//! Session token tracking.
//!
//! A streamable HTTP server may assign a session on any response via the
//! `Mcp-Session-Id` header. Once seen, the token is sent on every later request.
//! The token lives as long as the bridge; there is no way to clear it.
//!
//! Concurrent lines may race to store a token. The last write wins; a
//! compliant server keeps the token stable once issued.

use std::sync::{Mutex, PoisonError};

/// Session header of the MCP streamable HTTP transport
pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

#[derive(Debug, Default)]
pub struct SessionState {
    token: Mutex<Option<String>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store `token` if it differs from the current one.
    ///
    /// Returns `true` when the stored value changed.
    pub fn update(&self, token: &str) -> bool {
        let mut current = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_deref() == Some(token) {
            return false;
        }
        *current = Some(token.to_string());
        true
    }
}
