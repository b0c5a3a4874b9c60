use ahma_stdio_bridge::{
    BridgeConfig, LogLevel, StdioBridge,
    config::{DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_URL},
    logging::init_logging,
};
use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

/// stdio-to-HTTP bridge for MCP servers.
///
/// Reads newline-delimited JSON-RPC on stdin, forwards each message to a
/// streamable HTTP MCP endpoint and writes one response line per message on stdout.
#[derive(Parser, Debug)]
#[command(name = "ahma_stdio_bridge")]
#[command(version, about)]
struct Args {
    /// MCP endpoint to forward messages to.
    #[arg(long, env = "AHMA_BRIDGE_URL", default_value = DEFAULT_URL)]
    url: Url,

    /// Timeout for each forwarded request, in milliseconds.
    #[arg(long, env = "AHMA_BRIDGE_TIMEOUT_MS", default_value_t = DEFAULT_REQUEST_TIMEOUT_MS)]
    timeout: u64,

    /// Log verbosity (logs go to stderr). RUST_LOG takes precedence when set.
    #[arg(long, env = "AHMA_BRIDGE_LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Start without probing the server's /health endpoint.
    #[arg(long)]
    skip_health_check: bool,

    /// Only probe the server's /health endpoint, report and exit.
    #[arg(long, conflicts_with = "skip_health_check")]
    check_health: bool,
}

impl Args {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            url: self.url.clone(),
            request_timeout: Duration::from_millis(self.timeout),
            skip_health_check: self.skip_health_check,
            log_level: self.log_level,
            ..BridgeConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(args));

    // stdin is read on a blocking thread that cannot be interrupted
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    let bridge = StdioBridge::new(args.bridge_config());

    if args.check_health {
        bridge.check_health().await?;
        eprintln!("MCP server at {} is healthy", bridge.config().url);
        return Ok(());
    }

    info!("Starting Ahma stdio bridge");
    info!("Forwarding to: {}", bridge.config().url);
    info!(
        "Request timeout: {}ms",
        bridge.config().request_timeout.as_millis()
    );

    bridge
        .start(tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("Failed to start bridge")?;

    tokio::select! {
        _ = bridge.wait_stopped() => {}
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            bridge.stop();
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
