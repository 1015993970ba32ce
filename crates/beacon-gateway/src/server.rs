//! Server setup and lifecycle management

use std::time::Duration;

use tracing::{info, warn};

use beacon_transport::GracefulServer;

use crate::api::{create_router, AppState};
use crate::config::GatewayConfig;
use crate::discovery::RegistryClient;
use crate::error::{DaemonError, DaemonResult};

/// Beacon gateway server
pub struct Server {
    config: GatewayConfig,
    state: AppState,
}

impl Server {
    /// Create a new server with the given configuration.
    pub fn new(config: GatewayConfig) -> DaemonResult<Self> {
        let registry = RegistryClient::new(&config.registry)
            .map_err(|e| DaemonError::Client(e.to_string()))?;
        let state = AppState::new(registry, &config.forward)?;
        Ok(Self { config, state })
    }

    /// Run the server until a shutdown signal arrives, then drain.
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let drain_timeout = Duration::from_secs(self.config.server.drain_timeout_secs);
        let drain_budget = Duration::from_secs(self.config.server.drain_budget_secs);

        let app = create_router(self.state);

        let server = GracefulServer::bind(addr)
            .await?
            .with_drain_budget(drain_budget);
        let handle = server.serve(app);

        info!(addr = %handle.local_addr(), "Gateway listening");

        shutdown_signal().await;

        if !handle.shutdown(drain_timeout).await {
            warn!("Shutdown drain timed out with connections still open");
        }

        info!("Gateway stopped");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
