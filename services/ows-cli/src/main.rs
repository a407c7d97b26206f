//! OGC web service command line client.
//!
//! Connects to a catalogue (CSW) or feature service (WFS) through its
//! capabilities document and prints results as JSON on stdout. Logs go to
//! stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use csw_client::CswClient;
use ows_protocol::{ClientConfig, Url};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use wfs_client::WfsClient;

use ows_cli::commands::{self, CapabilitiesSummary};
use ows_cli::{CapabilitiesArgs, CliConfig, FeaturesArgs, InsertArgs, RecordsArgs, ServiceKind};

#[derive(Parser, Debug)]
#[command(name = "ows-cli")]
#[command(about = "Query OGC catalogue and feature services")]
struct Args {
    /// Request timeout in milliseconds (0 waits forever)
    #[arg(long, global = true, env = "OWS_CLIENT_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long, global = true, env = "OWS_CLIENT_USER_AGENT")]
    user_agent: Option<String>,

    /// YAML configuration file
    #[arg(long, global = true, env = "OWS_CLI_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the negotiated version and operation bindings
    Capabilities(CapabilitiesArgs),
    /// Search a catalogue with GetRecords
    Records(RecordsArgs),
    /// Insert records into a catalogue
    Insert(InsertArgs),
    /// Fetch features with GetFeature
    Features(FeaturesArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = CliConfig::resolve(
        args.config.as_deref(),
        args.timeout_ms,
        args.user_agent.clone(),
    )?;
    info!(
        timeout_ms = config.client.timeout_ms,
        user_agent = %config.client.user_agent,
        "Starting ows-cli"
    );

    match &args.command {
        Command::Capabilities(cmd) => {
            let url = parse_url(&cmd.url)?;
            let summary = match cmd.service {
                ServiceKind::Csw => {
                    let client = CswClient::connect(url, &config.client).await?;
                    CapabilitiesSummary::new(client.capabilities(), client.inner().version())
                }
                ServiceKind::Wfs => {
                    let client = WfsClient::connect(url, &config.client).await?;
                    CapabilitiesSummary::new(client.capabilities(), client.version())
                }
            };
            print_json(&summary, args.pretty)
        }
        Command::Records(cmd) => {
            let client = connect_csw(&cmd.url, &config.client).await?;
            let summary = commands::records(&client, cmd, &config.namespaces).await?;
            print_json(&summary, args.pretty)
        }
        Command::Insert(cmd) => {
            let client = connect_csw(&cmd.url, &config.client).await?;
            let response = commands::insert(&client, &cmd.files).await?;
            print_json(&response, args.pretty)
        }
        Command::Features(cmd) => {
            let url = parse_url(&cmd.url)?;
            let client = WfsClient::connect(url, &config.client)
                .await
                .context("Failed to connect to feature service")?;
            let summary = commands::features(&client, cmd, &config.namespaces).await?;
            print_json(&summary, args.pretty)
        }
    }
}

fn parse_url(value: &str) -> Result<Url> {
    Url::parse(value).with_context(|| format!("Invalid URL: {}", value))
}

async fn connect_csw(url: &str, config: &ClientConfig) -> Result<CswClient> {
    CswClient::connect(parse_url(url)?, config)
        .await
        .context("Failed to connect to catalogue")
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}
