//! Proximity Daemon - deploys and operates containerized applications
//! as LXC containers on Proxmox VE hypervisors.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod cmd;

use cmd::Commands;

#[derive(Parser)]
#[command(name = "proximityd")]
#[command(about = "Proximity control-plane daemon")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("proximity_daemon={}", log_level).into()),
        )
        .init();

    info!("Starting Proximity Daemon v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Some(Commands::Diagnostics) => cmd::diagnostics::run(&cli.config).await,
        None => cmd::root::run(&cli.config).await,
    };

    if let Err(e) = result {
        error!("daemon error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
