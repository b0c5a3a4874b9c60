//! HTTP side of the bridge.
//!
//! [`HttpTransport`] turns one JSON-RPC envelope into a POST against the MCP
//! endpoint and turns the response, JSON or SSE, back into one envelope. It
//! never writes to the output stream; every failure is returned to the caller.

use crate::config::{BridgeConfig, HEALTH_CHECK_TIMEOUT};
use crate::error::{BridgeError, Result};
use crate::events::{BridgeEvent, EventBus};
use crate::session::{MCP_SESSION_ID_HEADER, SessionState};
use crate::sse;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const ACCEPT_JSON_OR_SSE: &str = "application/json, text/event-stream";
const HEALTH_PATH: &str = "/health";

/// Derive the health endpoint served on the same origin as the MCP endpoint.
///
/// `http://localhost:3000/mcp` becomes `http://localhost:3000/health`.
pub fn health_url(url: &Url) -> Url {
    let mut health = url.clone();
    health.set_path(HEALTH_PATH);
    health.set_query(None);
    health.set_fragment(None);
    health
}

pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    health_url: Url,
    request_timeout: Duration,
    health_check_timeout: Duration,
    session: SessionState,
    events: EventBus,
}

impl HttpTransport {
    pub fn new(config: &BridgeConfig, events: EventBus) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            health_url: health_url(&config.url),
            request_timeout: config.request_timeout,
            health_check_timeout: HEALTH_CHECK_TIMEOUT,
            session: SessionState::new(),
            events,
        }
    }

    #[cfg(test)]
    fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn health_url(&self) -> &Url {
        &self.health_url
    }

    /// The session token currently attached to outbound requests.
    pub fn session_id(&self) -> Option<String> {
        self.session.current()
    }

    /// POST `envelope` to the MCP endpoint and return the decoded response.
    ///
    /// The whole exchange, body included, is bounded by the request timeout.
    /// Expiry cancels only this call and yields [`BridgeError::Timeout`].
    pub async fn forward(&self, envelope: &Value) -> Result<Value> {
        match tokio::time::timeout(self.request_timeout, self.post(envelope)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    url = %self.url,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "Forwarded request timed out"
                );
                Err(BridgeError::Timeout(self.request_timeout))
            }
        }
    }

    async fn post(&self, envelope: &Value) -> Result<Value> {
        let mut request = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, ACCEPT_JSON_OR_SSE)
            .json(envelope);

        if let Some(session_id) = self.session.current() {
            request = request.header(MCP_SESSION_ID_HEADER, session_id);
        }

        let response = request.send().await?;
        self.capture_session(response.headers());

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;

        debug!(%status, content_type = %content_type, "Received HTTP response");

        if sse::is_event_stream(&content_type) {
            return sse::decode_first_data(&body);
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok(value),
            Err(e) if status.is_success() => Err(e.into()),
            Err(_) => Err(BridgeError::HttpStatus { status, body }),
        }
    }

    /// Record a session token from any response, whatever its body.
    fn capture_session(&self, headers: &HeaderMap) {
        let Some(session_id) = headers
            .get(MCP_SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };

        if self.session.update(session_id) {
            info!(session_id = %session_id, "Session established");
            self.events
                .publish(BridgeEvent::SessionEstablished(session_id.to_string()));
        }
    }

    /// Probe the server's health endpoint.
    ///
    /// Any non-2xx status, network failure or deadline expiry is reported as
    /// [`BridgeError::ServerUnreachable`].
    pub async fn check_health(&self) -> Result<()> {
        debug!(url = %self.health_url, "Checking server health");

        let probe = self.client.get(self.health_url.clone()).send();
        let cause = match tokio::time::timeout(self.health_check_timeout, probe).await {
            Ok(Ok(response)) if response.status().is_success() => return Ok(()),
            Ok(Ok(response)) => format!("HTTP {}", response.status()),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "Health check timed out after {}ms",
                self.health_check_timeout.as_millis()
            ),
        };

        Err(BridgeError::ServerUnreachable {
            url: self.url.to_string(),
            cause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn health_url_replaces_message_path() {
        let url = Url::parse("http://localhost:3000/mcp").unwrap();
        assert_eq!(health_url(&url).as_str(), "http://localhost:3000/health");
    }

    #[test]
    fn health_url_keeps_origin_and_drops_query() {
        let url = Url::parse("https://example.com:8443/api/v1/mcp?token=x#frag").unwrap();
        assert_eq!(health_url(&url).as_str(), "https://example.com:8443/health");
    }

    #[test]
    fn health_check_deadline_is_fixed() {
        let config = BridgeConfig {
            request_timeout: Duration::from_millis(50),
            ..BridgeConfig::default()
        };
        let transport = HttpTransport::new(&config, EventBus::new());
        assert_eq!(transport.health_check_timeout, HEALTH_CHECK_TIMEOUT);
        assert_eq!(transport.health_check_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn slow_health_endpoint_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
            .mount(&server)
            .await;

        let config = BridgeConfig::new(&format!("{}/mcp", server.uri())).unwrap();
        let transport = HttpTransport::new(&config, EventBus::new())
            .with_health_check_timeout(Duration::from_millis(100));
        let err = transport.check_health().await.unwrap_err();

        assert!(matches!(err, BridgeError::ServerUnreachable { .. }));
        assert!(err.to_string().contains("timed out"), "got: {}", err);
    }

    #[tokio::test]
    async fn https_endpoint_has_a_tls_connector() {
        let config = BridgeConfig {
            request_timeout: Duration::from_secs(2),
            ..BridgeConfig::new("https://127.0.0.1:1/mcp").unwrap()
        };
        let transport = HttpTransport::new(&config, EventBus::new());
        let err = transport
            .forward(&json!({"jsonrpc": "2.0", "method": "ping", "id": 1}))
            .await
            .unwrap_err();

        let mut chain = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(e) = source {
            chain.push_str(&format!(": {}", e));
            source = e.source();
        }
        assert!(!chain.contains("scheme is not http"), "got: {}", chain);
    }

    #[test]
    fn new_transport_has_no_session() {
        let transport = HttpTransport::new(&BridgeConfig::default(), EventBus::new());
        assert!(transport.session_id().is_none());
        assert_eq!(transport.url().as_str(), "http://localhost:3000/mcp");
        assert_eq!(
            transport.health_url().as_str(),
            "http://localhost:3000/health"
        );
    }

    #[test]
    fn capture_session_publishes_once_per_value() {
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let transport = HttpTransport::new(&BridgeConfig::default(), events);

        let mut headers = HeaderMap::new();
        headers.insert(MCP_SESSION_ID_HEADER, "session123".parse().unwrap());
        transport.capture_session(&headers);
        transport.capture_session(&headers);

        assert_eq!(transport.session_id().as_deref(), Some("session123"));
        assert_eq!(
            rx.try_recv().unwrap(),
            BridgeEvent::SessionEstablished("session123".to_string())
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn capture_session_ignores_missing_header() {
        let transport = HttpTransport::new(&BridgeConfig::default(), EventBus::new());
        transport.capture_session(&HeaderMap::new());
        assert!(transport.session_id().is_none());
    }
}
