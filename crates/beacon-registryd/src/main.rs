//! Beacon Registry Daemon - service discovery control plane
//!
//! The registry daemon provides:
//! - REST endpoint for instance registration and lookup
//! - Periodic expiration of instances whose pods are gone
//! - Graceful connection draining on shutdown

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beacon_registryd::config::RegistrydConfig;
use beacon_registryd::server::Server;

/// Registry daemon CLI
#[derive(Parser)]
#[command(name = "beacon-registryd")]
#[command(about = "Beacon registry daemon - service discovery control plane", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BEACON_CONFIG")]
    config: Option<String>,

    /// Listen address (overrides configuration)
    #[arg(short, long, env = "BEACON_LISTEN_ADDR")]
    listen: Option<String>,

    /// Disable the expiration engine
    #[arg(long, env = "BEACON_NO_EXPIRE")]
    no_expire: bool,

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
        RegistrydConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen.parse().context("Invalid listen address")?;
    }
    if cli.no_expire {
        config.expiration.enabled = false;
    }

    let server = Server::new(config).context("Failed to initialize registry daemon")?;
    server.run().await.context("Registry daemon failed")?;

    Ok(())
}
