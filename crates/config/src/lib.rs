//! Authority Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid config: the server listens on
//! `localhost:38457` and serves `data/prod/data.json`.
//!
//! # Parsing
//!
//! ```
//! use authority_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[dataset]\npath = \"servers.json\"").unwrap();
//! assert_eq!(config.dataset.path.to_str(), Some("servers.json"));
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "console"
//!
//! [server]
//! address = "localhost:38457"
//! max_connections = 100
//! request_timeout = "10s"
//! call_timeout = "30s"
//!
//! [dataset]
//! path = "data/prod/data.json"
//! ```

mod dataset;
mod error;
mod logging;
mod server;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use dataset::DatasetConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use server::ServerConfig;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Listener settings
    pub server: ServerConfig,

    /// Dataset location
    pub dataset: DatasetConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.server.address, "localhost:38457");
        assert_eq!(config.dataset.path.to_str(), Some("data/prod/data.json"));
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[server]
address = "0.0.0.0:9000"
max_connections = 8
call_timeout = "5s"

[dataset]
path = "/srv/authority/servers.json"
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.server.address, "0.0.0.0:9000");
        assert_eq!(config.server.max_connections, 8);
        assert_eq!(config.server.call_timeout, Some(Duration::from_secs(5)));
        assert_eq!(
            config.dataset.path.to_str(),
            Some("/srv/authority/servers.json")
        );
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation_runs_on_parse() {
        let result = Config::from_str("[server]\nmax_connections = 0");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dataset]\npath = \"fixtures/servers.json\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.dataset.path.to_str(), Some("fixtures/servers.json"));
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file("/nonexistent/authority.toml");
        match result {
            Err(ConfigError::IoError { path, .. }) => {
                assert_eq!(path, "/nonexistent/authority.toml");
            }
            other => panic!("expected IoError, got {other:?}"),
        }
    }
}
