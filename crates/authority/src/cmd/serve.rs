//! Serve command - Run the Authority server

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use authority_config::Config;
use authority_service::{Authority, AuthorityServer};

/// Config files tried, in order, when none is given
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["configs/config.toml", "config.toml"];

/// Serve command arguments
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file (defaults to configs/config.toml if not specified)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Config file to load: the explicit path, else the first default that exists
pub fn locate_config(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => DEFAULT_CONFIG_PATHS
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists()),
    }
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %config.server.address,
        dataset = %config.dataset.path.display(),
        "Authority starting"
    );

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("Authority shutdown complete");
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        // User explicitly provided config path - must exist
        if !path.exists() {
            return Err(anyhow::anyhow!("config file not found: {}", path.display()));
        }
    }

    match locate_config(explicit) {
        Some(path) => {
            info!(config = %path.display(), "using config file");
            Config::from_file(&path).context("failed to load configuration")
        }
        None => {
            info!("no config file found, using defaults");
            Ok(Config::default())
        }
    }
}

async fn run_server(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    let authority = Authority::from_config(&config.dataset);
    if !authority.dataset_path().exists() {
        // Not fatal: every call reports SourceUnavailable until it appears
        warn!(
            dataset = %authority.dataset_path().display(),
            "dataset file not found"
        );
    }

    let server = AuthorityServer::new(authority, config.server);
    let listener = server.bind().await?;
    let handle = tokio::spawn(server.serve(listener, cancel.clone()));

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping server...");
    cancel.cancel();

    handle.await.context("server task panicked")??;
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_is_used_as_is() {
        let path = Path::new("custom.toml");
        assert_eq!(locate_config(Some(path)), Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/authority.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_explicit_config_loads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[server]\naddress = \"127.0.0.1:9000\"\n").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.server.address, "127.0.0.1:9000");
    }
}
