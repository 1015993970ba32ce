//! Server setup and lifecycle management

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use beacon_registry::{
    ClusterPodLister, ExpirationConfig, ExpirationEngine, ServiceRegistry,
};
use beacon_transport::GracefulServer;

use crate::api::{create_router, AppState};
use crate::config::RegistrydConfig;
use crate::error::{DaemonError, DaemonResult};

/// Beacon registry daemon server
pub struct Server {
    config: RegistrydConfig,
    registry: Arc<ServiceRegistry>,
    engine: Option<ExpirationEngine>,
}

impl Server {
    /// Create a new server with the given configuration. When expiration
    /// is enabled, the in-cluster pod inventory must be reachable;
    /// missing credentials are fatal at startup rather than at the first
    /// sweep.
    pub fn new(config: RegistrydConfig) -> DaemonResult<Self> {
        let registry = Arc::new(ServiceRegistry::new());

        let engine = if config.expiration.enabled {
            let lister = ClusterPodLister::from_cluster()
                .map_err(|e| DaemonError::Expiration(e.to_string()))?;
            let namespace = match &config.expiration.namespace {
                Some(namespace) => namespace.clone(),
                None => ClusterPodLister::current_namespace()
                    .map_err(|e| DaemonError::Expiration(e.to_string()))?,
            };
            Some(ExpirationEngine::new(
                ExpirationConfig {
                    interval: Duration::from_secs(config.expiration.interval_secs),
                    namespace,
                    max_retries: config.expiration.max_retries,
                },
                Arc::clone(&registry),
                Arc::new(lister),
            ))
        } else {
            warn!("Expiration engine disabled, stale registrations will not be pruned");
            None
        };

        Ok(Self {
            config,
            registry,
            engine,
        })
    }

    /// Run the server until a shutdown signal arrives, then drain.
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let drain_timeout = Duration::from_secs(self.config.server.drain_timeout_secs);
        let drain_budget = Duration::from_secs(self.config.server.drain_budget_secs);

        let app = create_router(AppState::new(Arc::clone(&self.registry)));

        let server = GracefulServer::bind(addr)
            .await?
            .with_drain_budget(drain_budget);
        let handle = server.serve(app);

        if let Some(engine) = &self.engine {
            engine.start();
        }

        info!(addr = %handle.local_addr(), "Registry daemon listening");

        shutdown_signal().await;

        // Drain before the sweep stops, so expiration keeps running for
        // requests still completing.
        handle.begin_drain();
        if !handle.wait_drained(drain_timeout).await {
            warn!("Shutdown drain timed out with connections still open");
        }
        if let Some(engine) = &self.engine {
            engine.stop();
        }
        handle.stop();

        info!("Registry daemon stopped");
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
