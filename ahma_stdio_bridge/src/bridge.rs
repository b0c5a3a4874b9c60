//! stdio-to-HTTP bridge controller.
//!
//! [`StdioBridge`] reads newline-delimited JSON-RPC from an input stream, sends
//! each message through [`HttpTransport`] and writes exactly one response line
//! per non-blank input line to the output stream.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --start()--> Running --stop() / input closed--> Stopped --start()--> Running
//! ```
//!
//! Starting while `Running` fails with [`BridgeError::AlreadyRunning`].
//!
//! ## Concurrency
//!
//! Every line is handled in its own task, so a slow request never holds up
//! reading the next line. Responses may therefore leave in a different order
//! than the requests arrived. Each response is written with a single locked
//! write, so lines never interleave.
//!
//! `stop()` detaches the read loop but leaves requests already sent to the
//! server running; their responses are dropped. When the input stream closes,
//! lines already read are allowed to finish and write their responses before
//! the bridge stops.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::events::{BridgeEvent, EventBus};
use crate::jsonrpc;
use crate::transport::HttpTransport;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::{Mutex as AsyncMutex, broadcast, watch},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Stopped,
}

type SharedOutput<W> = Arc<AsyncMutex<W>>;

struct BridgeInner {
    config: BridgeConfig,
    transport: HttpTransport,
    events: EventBus,
    state: watch::Sender<LifecycleState>,
    /// Cancellation handle of the current read loop; `Some` exactly while `Running`.
    run: Mutex<Option<CancellationToken>>,
    span: Span,
}

/// Bridges a line-oriented JSON-RPC stream pair to an MCP HTTP endpoint.
///
/// Cloning is cheap; clones share the same lifecycle and session.
///
/// # Example
///
/// ```rust,no_run
/// use ahma_stdio_bridge::{BridgeConfig, StdioBridge};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let bridge = StdioBridge::new(BridgeConfig::default());
///     bridge.start(tokio::io::stdin(), tokio::io::stdout()).await?;
///     bridge.wait_stopped().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct StdioBridge {
    inner: Arc<BridgeInner>,
}

impl StdioBridge {
    /// Creates an idle bridge that logs under a `stdio_bridge` span.
    pub fn new(config: BridgeConfig) -> Self {
        let span = info_span!("stdio_bridge", url = %config.url);
        Self::with_span(config, span)
    }

    /// Creates an idle bridge whose tasks all log under `span`.
    pub fn with_span(config: BridgeConfig, span: Span) -> Self {
        let events = EventBus::new();
        let transport = HttpTransport::new(&config, events.clone());
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            inner: Arc::new(BridgeInner {
                config,
                transport,
                events,
                state,
                run: Mutex::new(None),
                span,
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// The session token assigned by the server, if any.
    pub fn session_id(&self) -> Option<String> {
        self.inner.transport.session_id()
    }

    /// Subscribe to lifecycle, session and error notifications.
    pub fn events(&self) -> broadcast::Receiver<BridgeEvent> {
        self.inner.events.subscribe()
    }

    /// Resolves once the bridge is `Stopped`.
    pub async fn wait_stopped(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|s| *s == LifecycleState::Stopped).await;
    }

    /// Probe the server's health endpoint with a fixed 5 second deadline.
    pub async fn check_health(&self) -> Result<()> {
        self.inner
            .transport
            .check_health()
            .instrument(self.inner.span.clone())
            .await
    }

    /// Start bridging `input` to `output`.
    ///
    /// Unless the config skips it, the server health is checked first and a
    /// failure is returned without starting. The read loop runs in a background
    /// task; this returns once it is attached.
    pub async fn start<R, W>(&self, input: R, output: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        if self.is_running() {
            return Err(BridgeError::AlreadyRunning);
        }

        if !self.inner.config.skip_health_check {
            self.check_health().await?;
        }

        let cancel = {
            let mut run = self.inner.run.lock().unwrap_or_else(PoisonError::into_inner);
            if run.is_some() {
                return Err(BridgeError::AlreadyRunning);
            }
            let cancel = CancellationToken::new();
            *run = Some(cancel.clone());
            self.inner.state.send_replace(LifecycleState::Running);
            cancel
        };

        self.inner.span.in_scope(|| info!("Bridge started"));
        self.inner.events.publish(BridgeEvent::Started);

        let inner = self.inner.clone();
        let span = self.inner.span.clone();
        tokio::spawn(read_loop(inner, input, output, cancel).instrument(span));

        Ok(())
    }

    /// Detach the read loop and move to `Stopped`. No-op unless running.
    pub fn stop(&self) {
        self.inner.stop(None);
    }

    /// Turn one input line into its response envelope.
    ///
    /// Never fails: unparseable input yields a `-32700` error and any
    /// forwarding failure yields a `-32603` error echoing the request id.
    pub async fn handle_message(&self, line: &str) -> Value {
        self.inner
            .handle_message(line)
            .instrument(self.inner.span.clone())
            .await
    }
}

impl BridgeInner {
    /// Stop the current run. With `only` set, stop only if that run is still current.
    fn stop(&self, only: Option<&CancellationToken>) {
        {
            let mut run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
            if only.is_some_and(CancellationToken::is_cancelled) {
                return;
            }
            let Some(cancel) = run.take() else {
                return;
            };
            cancel.cancel();
            self.state.send_replace(LifecycleState::Stopped);
        }

        self.span.in_scope(|| info!("Bridge stopped"));
        self.events.publish(BridgeEvent::Stopped);
    }

    async fn handle_message(&self, line: &str) -> Value {
        let envelope: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to parse input line: {}", e);
                debug!("Unparseable input: {}", line);
                self.events.publish(BridgeEvent::Error {
                    id: Value::Null,
                    message: "Parse error".to_string(),
                });
                return jsonrpc::parse_error_response();
            }
        };

        let method = jsonrpc::method(&envelope);
        let id = jsonrpc::request_id(&envelope);
        debug!(method = ?method, id = %id, "Forwarding message");

        match self.transport.forward(&envelope).await {
            Ok(response) => response,
            Err(e) => {
                let cause = e.to_string();
                error!(method = ?method, id = %id, "Failed to forward message: {}", cause);
                self.events.publish(BridgeEvent::Error {
                    id,
                    message: cause.clone(),
                });
                jsonrpc::bridge_error_response(&envelope, &cause)
            }
        }
    }
}

async fn read_loop<R, W>(
    inner: Arc<BridgeInner>,
    input: R,
    output: W,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let output: SharedOutput<W> = Arc::new(AsyncMutex::new(output));
    let mut lines = BufReader::new(input).split(b'\n');
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(in_flight = in_flight.len(), "Read loop detached");
                in_flight.detach_all();
                return;
            }

            next = lines.next_segment() => {
                match next {
                    Ok(Some(raw)) => {
                        let line = decode_line(raw);
                        if line.trim().is_empty() {
                            continue;
                        }
                        let task = process_line(inner.clone(), line, output.clone(), cancel.clone());
                        in_flight.spawn(task.instrument(inner.span.clone()));
                    }
                    Ok(None) => {
                        info!("Input stream closed");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!("Message task failed: {}", e);
                }
            }
        }
    }

    let drained = async {
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!("Message task failed: {}", e);
            }
        }
    };
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = drained => {}
    }
    in_flight.detach_all();

    inner.stop(Some(&cancel));
}

/// Decode one raw input line, dropping a trailing `\r`.
///
/// Invalid UTF-8 is replaced rather than rejected so the line still reaches
/// the JSON parser and gets its own parse error response.
fn decode_line(mut raw: Vec<u8>) -> String {
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    match String::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => {
            warn!("Input line is not valid UTF-8: {}", e.utf8_error());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

async fn process_line<W>(
    inner: Arc<BridgeInner>,
    line: String,
    output: SharedOutput<W>,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin + Send,
{
    let response = inner.handle_message(&line).await;

    if cancel.is_cancelled() {
        debug!(id = %jsonrpc::request_id(&response), "Bridge stopped, dropping response");
        return;
    }

    if let Err(e) = write_line(&output, &response).await {
        error!("Failed to write response: {}", e);
    }
}

/// Write `message` as one line with a single write under the output lock.
async fn write_line<W>(output: &SharedOutput<W>, message: &Value) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = serde_json::to_vec(message)?;
    buf.push(b'\n');

    let mut out = output.lock().await;
    out.write_all(&buf).await?;
    out.flush().await?;
    Ok(())
}
