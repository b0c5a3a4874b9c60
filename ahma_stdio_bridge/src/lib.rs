//! # Ahma stdio Bridge
//!
//! Lets an MCP client that only speaks newline-delimited JSON-RPC over
//! stdin/stdout talk to an MCP server that only speaks streamable HTTP.
//!
//! ## Architecture
//!
//! *   **Bridge controller** ([`StdioBridge`]): owns the lifecycle
//!     (`Idle` → `Running` → `Stopped`), reads input lines, and writes exactly one
//!     response line for every non-blank input line.
//! *   **HTTP transport** ([`transport::HttpTransport`]): POSTs each message to the
//!     MCP endpoint with `Accept: application/json, text/event-stream`, carries the
//!     `Mcp-Session-Id` assigned by the server, and decodes JSON or SSE responses.
//!
//! Failures while handling a line never stop the bridge. They are answered
//! with a JSON-RPC error: `-32700` for unparseable input, `-32603` for
//! anything that went wrong on the HTTP side.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ahma_stdio_bridge::{BridgeConfig, StdioBridge};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::new("http://127.0.0.1:3000/mcp")?;
//!     let bridge = StdioBridge::new(config);
//!
//!     // Fails fast if GET http://127.0.0.1:3000/health does not answer 2xx
//!     bridge.start(tokio::io::stdin(), tokio::io::stdout()).await?;
//!     bridge.wait_stopped().await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod jsonrpc;
pub mod logging;
pub mod session;
pub mod sse;
pub mod transport;

pub use bridge::{LifecycleState, StdioBridge};
pub use config::{BridgeConfig, LogLevel};
pub use error::{BridgeError, Result};
pub use events::BridgeEvent;
