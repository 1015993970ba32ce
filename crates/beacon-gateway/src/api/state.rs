//! Application state for gateway handlers

use crate::config::ForwardConfig;
use crate::discovery::RegistryClient;
use crate::error::{DaemonError, DaemonResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Registry endpoint client
    pub registry: RegistryClient,

    /// Client used for forwarding to instances
    pub forwarder: reqwest::Client,

    /// Path on the selected instance the payload is delivered to
    pub forward_path: String,

    /// Gateway version
    pub version: String,

    /// Gateway start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(registry: RegistryClient, forward: &ForwardConfig) -> DaemonResult<Self> {
        let forwarder = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(forward.timeout_secs))
            .build()
            .map_err(|e| DaemonError::Client(e.to_string()))?;
        Ok(Self {
            registry,
            forwarder,
            forward_path: forward.path.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        })
    }
}
