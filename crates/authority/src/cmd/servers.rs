//! Servers command - query a running Authority server
//!
//! Sends one `Servers` request and prints every match as it arrives.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing_subscriber::EnvFilter;

use authority_config::ServerConfig;
use authority_protocol::{ServerMsg, ServersRequest};
use authority_service::AuthorityClient;

/// Servers command arguments
#[derive(Args, Debug)]
pub struct ServersArgs {
    /// Server address (host:port)
    #[arg(short, long, default_value_t = ServerConfig::default().address)]
    addr: String,

    /// Regex matched against server names (unanchored)
    #[arg(short, long, value_name = "REGEX")]
    name: Option<String>,

    /// Datacenter to include (can be repeated)
    #[arg(short, long = "dc", value_name = "DC")]
    datacenters: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Verbose output (show debug info)
    #[arg(short, long)]
    verbose: bool,
}

/// How matches are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One name per line
    Text,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    fn render(self, server: &ServerMsg) -> String {
        match self {
            Self::Text => server.name.clone(),
            Self::Json => serde_json::json!({ "name": server.name }).to_string(),
        }
    }
}

/// Run the servers command
pub async fn run(args: ServersArgs) -> Result<()> {
    // Logs go to stderr, results to stdout
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let request = build_request(&args);

    tracing::debug!(address = %args.addr, "connecting to server");
    let mut client = AuthorityClient::connect(&args.addr).await?;
    client
        .servers(&request)
        .await
        .context("failed to send request")?;

    let mut count = 0u64;
    loop {
        tokio::select! {
            result = client.recv() => {
                match result? {
                    Some(server) => {
                        println!("{}", args.output.render(&server));
                        count += 1;
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                // Dropping the connection cancels the call server-side
                tracing::debug!("interrupted");
                break;
            }
        }
    }

    tracing::debug!(count, "done");
    Ok(())
}

fn build_request(args: &ServersArgs) -> ServersRequest {
    let mut request = ServersRequest::new();

    if let Some(name) = &args.name {
        request = request.with_name_filter(name.clone());
    }

    if !args.datacenters.is_empty() {
        request = request.with_datacenters(args.datacenters.clone());
    }

    request
}
