//! Bridge configuration.

use crate::error::Result;
use clap::ValueEnum;
use std::time::Duration;
use url::Url;

/// Default MCP endpoint, matching the HTTP bridge's default bind address.
pub const DEFAULT_URL: &str = "http://localhost:3000/mcp";

/// Default timeout for a forwarded request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// The startup health probe is always bounded by this, regardless of the request timeout.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Log verbosity accepted on the command line.
///
/// `tracing` has no fatal level, so `Fatal` filters the same as `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error | LogLevel::Fatal => "error",
        }
    }
}

/// Configuration for one bridge instance.
///
/// The bridge takes ownership at construction and never mutates it.
///
/// # Example
///
/// ```rust
/// use ahma_stdio_bridge::BridgeConfig;
/// use std::time::Duration;
///
/// let config = BridgeConfig {
///     request_timeout: Duration::from_secs(10),
///     ..BridgeConfig::new("http://127.0.0.1:8080/mcp").unwrap()
/// };
/// assert_eq!(config.url.as_str(), "http://127.0.0.1:8080/mcp");
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// MCP endpoint every input line is POSTed to.
    pub url: Url,

    /// Upper bound for one forwarded request, including reading the body.
    pub request_timeout: Duration,

    /// Start without probing the server first.
    pub skip_health_check: bool,

    pub log_level: LogLevel,
}

impl BridgeConfig {
    /// Creates a configuration for `url` with default timeouts.
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            ..Self::default()
        })
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_URL).expect("default URL is valid"),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            skip_health_check: false,
            log_level: LogLevel::default(),
        }
    }
}
