//! Configuration for beacon-registryd

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistrydConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Expiration engine configuration
    #[serde(default)]
    pub expiration: ExpirationSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Total budget for the drain phase of shutdown, in seconds
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,

    /// Per-connection drain budget, in seconds
    #[serde(default = "default_drain_budget")]
    pub drain_budget_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8888".parse().unwrap(),
            drain_timeout_secs: default_drain_timeout(),
            drain_budget_secs: default_drain_budget(),
        }
    }
}

/// Expiration engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirationSettings {
    /// Whether the periodic liveness sweep runs at all. Disable when the
    /// daemon runs outside a cluster and no pod inventory is reachable.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between sweeps
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,

    /// Namespace whose pods count as alive. When unset, the namespace the
    /// daemon itself runs in is used.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Immediate retries after a failed inventory fetch
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ExpirationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_sweep_interval(),
            namespace: None,
            max_retries: default_max_retries(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_drain_timeout() -> u64 {
    30
}

fn default_drain_budget() -> u64 {
    5
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RegistrydConfig {
    /// Load configuration from defaults, an optional file, and the
    /// environment, in that order of precedence.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&RegistrydConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BEACON")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
