//! Registry endpoint client.
//!
//! Queries `GET /registrations` with the function name riding in a JSON
//! body, the wire shape the registry daemon serves. Every call carries the
//! configured timeout.

use reqwest::{Method, StatusCode};
use thiserror::Error;
use tracing::debug;

use beacon_types::{Instance, Registration};

use crate::config::RegistryConfig;

/// Registry lookup errors.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Registry request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Registry returned status {0}")]
    Status(u16),

    #[error("Registry response malformed: {0}")]
    Malformed(String),
}

/// Client for the registry endpoint.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    registrations_url: String,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.query_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            registrations_url: format!("http://{}:{}/registrations", config.host, config.port),
        })
    }

    /// Instances currently registered for `function`. An empty vec means
    /// the registry answered and knows of none.
    pub async fn lookup(&self, function: &str) -> Result<Vec<Instance>, DiscoveryError> {
        let response = self
            .client
            .request(Method::GET, &self.registrations_url)
            .json(&Registration::query(function))
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => {
                debug!(function, "Registry knows no instances");
                Ok(Vec::new())
            }
            status if status.is_success() => {
                let envelope: Registration = response
                    .json()
                    .await
                    .map_err(|e| DiscoveryError::Malformed(e.to_string()))?;
                debug!(function, instances = envelope.services.len(), "Registry answered");
                Ok(envelope.services)
            }
            status => Err(DiscoveryError::Status(status.as_u16())),
        }
    }
}
