//! luminate - journaling API server

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use luminate::config::Config;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "luminate=info,tower_http=info";

/// luminate - journaling API server
#[derive(Parser, Debug)]
#[command(name = "luminate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Interface to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the JSON Schema of the config file
    Schema,
    /// Load and validate configuration, then print it (secret redacted)
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = Config::load(cli.config.as_deref()).context("invalid configuration")?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            luminate::gateway::run_gateway(config).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Schema => {
                println!("{}", Config::json_schema()?);
                Ok(())
            }
            ConfigAction::Check => {
                let config = Config::load(cli.config.as_deref()).context("invalid configuration")?;
                println!("{config:#?}");
                Ok(())
            }
        },
    }
}
