//! # Logging Initialization
//!
//! stdout carries the JSON-RPC stream, so all logs go to stderr.
//!
//! The filter comes from `RUST_LOG` when set; otherwise the level chosen on the
//! command line applies to every crate. `init_logging` installs the global
//! subscriber once; later calls are ignored.

use crate::config::LogLevel;
use std::io::{IsTerminal, stderr};
use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

/// Initialize verbose logging for tests.
pub fn init_test_logging() {
    init_logging(LogLevel::Trace);
}

/// Installs a stderr subscriber filtered at `log_level` unless `RUST_LOG` overrides it.
pub fn init_logging(log_level: LogLevel) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(log_level.as_filter()));

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(
                layer()
                    .with_writer(stderr)
                    .with_ansi(stderr().is_terminal()),
            )
            .try_init();
    });
}
