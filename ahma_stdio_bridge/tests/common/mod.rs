//! Shared test utilities for stdio bridge integration tests.
//!
//! `BridgeHarness` runs a [`StdioBridge`] over in-memory pipes against a
//! `wiremock` server, so tests can write input lines and read response lines
//! the way an MCP client on the other end of stdin/stdout would.

// Allow dead_code - these are test utilities, and rustc can't see usage across test crates
#![allow(dead_code)]

use ahma_stdio_bridge::{BridgeConfig, StdioBridge, logging::init_test_logging};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, duplex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Upper bound for waiting on any single response line.
pub const LINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Config pointing at `server`'s `/mcp` endpoint.
pub fn config_for(server: &MockServer) -> BridgeConfig {
    init_test_logging();
    BridgeConfig::new(&format!("{}/mcp", server.uri())).expect("mock server URI is valid")
}

/// Answer `GET /health` with 200.
pub async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(server)
        .await;
}

/// Client side of a running bridge.
pub struct BridgeHarness {
    pub bridge: StdioBridge,
    input: Option<DuplexStream>,
    output: Lines<BufReader<DuplexStream>>,
}

impl BridgeHarness {
    /// Start `bridge` over fresh pipes.
    pub async fn start(bridge: StdioBridge) -> Self {
        let (client_in, bridge_in) = duplex(64 * 1024);
        let (bridge_out, client_out) = duplex(64 * 1024);
        bridge
            .start(bridge_in, bridge_out)
            .await
            .expect("bridge should start");
        Self {
            bridge,
            input: Some(client_in),
            output: BufReader::new(client_out).lines(),
        }
    }

    /// Write one line (newline appended).
    pub async fn send_line(&mut self, line: &str) {
        self.send_bytes(line.as_bytes()).await;
    }

    /// Write raw bytes as one line, whether or not they are valid UTF-8.
    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        let input = self.input.as_mut().expect("input already closed");
        input.write_all(bytes).await.unwrap();
        input.write_all(b"\n").await.unwrap();
        input.flush().await.unwrap();
    }

    /// Read the next response line and parse it.
    pub async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(LINE_TIMEOUT, self.output.next_line())
            .await
            .expect("timed out waiting for response line")
            .expect("failed to read output")
            .expect("output closed before a response arrived");
        serde_json::from_str(&line).expect("response line should be JSON")
    }

    /// Send `line` and wait for its response.
    pub async fn request(&mut self, line: &str) -> Value {
        self.send_line(line).await;
        self.recv().await
    }

    /// Close the input stream, as a client exiting would.
    pub fn close_input(&mut self) {
        self.input.take();
    }

    /// Read the rest of the output until the bridge closes it.
    pub async fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let next = tokio::time::timeout(LINE_TIMEOUT, self.output.next_line())
                .await
                .expect("timed out waiting for output to close")
                .expect("failed to read output");
            match next {
                Some(line) => lines.push(line),
                None => return lines,
            }
        }
    }
}
