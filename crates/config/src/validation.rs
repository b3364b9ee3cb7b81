//! Configuration validation
//!
//! Validates config consistency:
//! - Listener address and connection limit are usable
//! - Timeouts are non-zero when set
//! - A dataset path is configured

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_dataset(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    let server = &config.server;

    if server.address.trim().is_empty() {
        return Err(ConfigError::invalid_value(
            "server",
            "address",
            "must not be empty",
        ));
    }

    if server.max_connections == 0 {
        return Err(ConfigError::invalid_value(
            "server",
            "max_connections",
            "must be at least 1",
        ));
    }

    if server.request_timeout == Duration::ZERO {
        return Err(ConfigError::invalid_value(
            "server",
            "request_timeout",
            "must be greater than zero",
        ));
    }

    if server.call_timeout == Some(Duration::ZERO) {
        return Err(ConfigError::invalid_value(
            "server",
            "call_timeout",
            "must be greater than zero (omit it to disable the deadline)",
        ));
    }

    Ok(())
}

fn validate_dataset(config: &Config) -> Result<()> {
    if config.dataset.path.as_os_str().is_empty() {
        return Err(ConfigError::invalid_value(
            "dataset",
            "path",
            "must not be empty",
        ));
    }

    Ok(())
}
