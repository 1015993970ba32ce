//! Beacon Gateway - function-to-instance request forwarding
//!
//! The gateway provides:
//! - A forwarding endpoint resolving a function name to a live instance
//! - Uniform-random selection among registered instances
//! - Verbatim relay of the selected instance's response

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod discovery;
mod error;
mod server;

use config::GatewayConfig;
use server::Server;

/// Gateway CLI
#[derive(Parser)]
#[command(name = "beacon-gateway")]
#[command(about = "Beacon gateway - resolves functions to instances and forwards requests", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BEACON_CONFIG")]
    config: Option<String>,

    /// Listen address (overrides configuration)
    #[arg(short, long, env = "BEACON_LISTEN_ADDR")]
    listen: Option<String>,

    /// Registry endpoint host (overrides configuration)
    #[arg(long, env = "BEACON_REGISTRY_HOST")]
    registry_host: Option<String>,

    /// Registry endpoint port (overrides configuration)
    #[arg(long, env = "BEACON_REGISTRY_PORT")]
    registry_port: Option<u16>,

    /// Log level
    #[arg(long, env = "BEACON_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "BEACON_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config =
        GatewayConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen.parse().context("Invalid listen address")?;
    }
    if let Some(host) = cli.registry_host {
        config.registry.host = host;
    }
    if let Some(port) = cli.registry_port {
        config.registry.port = port;
    }

    let server = Server::new(config).context("Failed to initialize gateway")?;
    server.run().await.context("Gateway failed")?;

    Ok(())
}
