//! Lifecycle and session notifications published to any number of observers.

use serde_json::Value;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// The read loop is attached and the bridge is running.
    Started,
    /// The read loop is detached.
    Stopped,
    /// The server assigned a new `Mcp-Session-Id`.
    SessionEstablished(String),
    /// Forwarding a line failed; an error response was written for `id`.
    Error { id: Value, message: String },
}

/// Fan-out of [`BridgeEvent`]s.
///
/// Publishing never blocks and never fails: with no subscribers the event is
/// dropped, and slow subscribers see `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: BridgeEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
