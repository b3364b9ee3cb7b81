//! `[log]` section
//!
//! Level and format of the server's own tracing output. Per-call outcomes
//! are logged at `debug`, so the default `info` only shows startup,
//! shutdown and completed calls.

use serde::Deserialize;

/// Verbosity of the server log
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Call state transitions and producer shutdown
    Trace,
    /// How each call ended
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive accepted by `tracing_subscriber::EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Shape of each log line
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text for a terminal
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

/// The `[log]` table; every key is optional
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// ```
///
/// A `--log-level` flag on the command line beats `level`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}
