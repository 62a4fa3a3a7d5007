//! Logging setup
//!
//! The library only emits `tracing` events; binaries call [`init_logging`]
//! once to install a subscriber. `RUST_LOG`, when set, takes precedence over
//! the configured level.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error or off
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// Events go to stderr so command output on stdout stays machine readable.
pub fn init_logging(config: &LoggingConfig) {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = build_env_filter(config);
        let registry = Registry::default().with(filter);

        // A subscriber installed elsewhere (e.g. by an embedding host) wins
        let _ = match config.format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Text => registry
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .try_init(),
        };
    });
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(config.level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}
