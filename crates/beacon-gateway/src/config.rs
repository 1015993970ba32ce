//! Configuration for beacon-gateway

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Registry endpoint client configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Forwarding configuration
    #[serde(default)]
    pub forward: ForwardConfig,

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
            listen_addr: "0.0.0.0:8080".parse().unwrap(),
            drain_timeout_secs: default_drain_timeout(),
            drain_budget_secs: default_drain_budget(),
        }
    }
}

/// Registry endpoint client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry endpoint host
    #[serde(default = "default_registry_host")]
    pub host: String,

    /// Registry endpoint port
    #[serde(default = "default_registry_port")]
    pub port: u16,

    /// Query timeout in seconds
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: default_registry_host(),
            port: default_registry_port(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

/// Forwarding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardConfig {
    /// Path on the selected instance the payload is delivered to
    #[serde(default = "default_forward_path")]
    pub path: String,

    /// Forward timeout in seconds
    #[serde(default = "default_forward_timeout")]
    pub timeout_secs: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            path: default_forward_path(),
            timeout_secs: default_forward_timeout(),
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

fn default_drain_timeout() -> u64 {
    30
}

fn default_drain_budget() -> u64 {
    5
}

fn default_registry_host() -> String {
    "127.0.0.1".to_string()
}

fn default_registry_port() -> u16 {
    8888
}

fn default_query_timeout() -> u64 {
    3
}

fn default_forward_path() -> String {
    "/chat/messages".to_string()
}

fn default_forward_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GatewayConfig {
    /// Load configuration from defaults, an optional file, and the
    /// environment, in that order of precedence.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&GatewayConfig::default())?);

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
