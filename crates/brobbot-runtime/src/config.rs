//! Configuration loading.
//!
//! Configuration is layered with figment, later sources overriding
//! earlier ones:
//!
//! 1. Built-in defaults
//! 2. `brobbot.toml` in the working directory (or an explicit path)
//! 3. Environment variables with the `BROBBOT_` prefix, `__` as the
//!    nesting separator (`BROBBOT_LOGGING__LEVEL=debug` →
//!    `logging.level = "debug"`)

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::RuntimeResult;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "brobbot.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BROBBOT_";

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrobbotConfig {
    /// The bot's name; the addressing pattern is derived from it.
    pub name: String,

    /// Optional short alias also accepted as an address prefix.
    pub alias: Option<String>,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for BrobbotConfig {
    fn default() -> Self {
        Self {
            name: "Brobbot".to_string(),
            alias: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level; `RUST_LOG` overrides it when set.
    pub level: LogLevel,

    /// Output format.
    pub format: LogFormat,
}

/// Log level (trace, debug, info, warn, error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// The level as an `EnvFilter` directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, terse output (default).
    #[default]
    Compact,
    /// Standard fmt output.
    Full,
    /// Multi-line human-oriented output.
    Pretty,
}

/// Loads configuration from the default locations.
pub fn load() -> RuntimeResult<BrobbotConfig> {
    load_from(CONFIG_FILE)
}

/// Loads configuration from a specific file path plus the environment.
pub fn load_from(path: &str) -> RuntimeResult<BrobbotConfig> {
    Ok(Figment::from(Serialized::defaults(BrobbotConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = BrobbotConfig::default();
        assert_eq!(config.name, "Brobbot");
        assert!(config.alias.is_none());
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config: BrobbotConfig =
            Figment::from(Serialized::defaults(BrobbotConfig::default()))
                .merge(Toml::string(
                    r#"
                    name = "Hal"
                    alias = "/"

                    [logging]
                    level = "debug"
                    format = "pretty"
                    "#,
                ))
                .extract()
                .unwrap();

        assert_eq!(config.name, "Hal");
        assert_eq!(config.alias.as_deref(), Some("/"));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config: BrobbotConfig =
            Figment::from(Serialized::defaults(BrobbotConfig::default()))
                .merge(Toml::string(r#"name = "Hal""#))
                .extract()
                .unwrap();

        assert_eq!(config.name, "Hal");
        assert_eq!(config.logging.level, LogLevel::Info);
    }
}
