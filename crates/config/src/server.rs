//! Listener configuration
//!
//! Controls the TCP listener that serves `Servers` calls.

use std::time::Duration;

use serde::Deserialize;

/// Default listen address
pub const DEFAULT_ADDRESS: &str = "localhost:38457";

/// Server configuration
///
/// # Example
///
/// ```toml
/// [server]
/// address = "localhost:38457"
/// max_connections = 100
/// request_timeout = "10s"
/// call_timeout = "30s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (host:port)
    /// Default: localhost:38457
    pub address: String,

    /// Maximum concurrent calls; extra connections are refused
    /// Default: 100
    pub max_connections: usize,

    /// Time a client has to send its request after connecting
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Deadline for a whole call (None = no deadline)
    /// Default: none
    #[serde(with = "humantime_serde")]
    pub call_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.into(),
            max_connections: 100,
            request_timeout: Duration::from_secs(10),
            call_timeout: None,
        }
    }
}
