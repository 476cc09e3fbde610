//! Logging setup.
//!
//! One call wires `tracing` to stdout with an `EnvFilter` derived from the
//! configuration. `RUST_LOG`, when present, wins over the configured
//! level. Initialization is idempotent: a second call (tests, embedding
//! hosts that installed their own subscriber) is a no-op.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Initializes the global tracing subscriber from configuration.
pub fn init_from_config(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        LogFormat::Compact => {
            let _ = builder.compact().try_init();
        }
        LogFormat::Full => {
            let _ = builder.try_init();
        }
        LogFormat::Pretty => {
            let _ = builder.pretty().try_init();
        }
    }
}
