//! Cluster pod inventory.
//!
//! The expiration engine compares registrations against the names of pods
//! currently alive in the cluster namespace. Listing pods is a blocking
//! call by contract; the engine runs it on the blocking pool, never on a
//! runtime worker thread.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::PodListError;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of live instance names. Implementations may block.
pub trait PodLister: Send + Sync {
    /// Names of pods currently alive in `namespace`.
    fn list_live_instance_names(&self, namespace: &str) -> Result<Vec<String>, PodListError>;
}

/// Pod lister backed by the in-cluster Kubernetes API, authenticated with
/// the mounted service-account credentials.
pub struct ClusterPodLister {
    client: reqwest::blocking::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Deserialize)]
struct Pod {
    metadata: PodMetadata,
}

#[derive(Deserialize)]
struct PodMetadata {
    name: String,
}

impl ClusterPodLister {
    /// Build a lister from the in-cluster environment. Fails when the
    /// service-account mount or the API host variables are missing; the
    /// hosting daemon treats that as fatal at startup.
    pub fn from_cluster() -> Result<Self, PodListError> {
        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = std::fs::read_to_string(dir.join("token"))
            .map_err(|e| PodListError::Credentials(format!("token: {e}")))?;
        let ca = std::fs::read(dir.join("ca.crt"))
            .map_err(|e| PodListError::Credentials(format!("ca.crt: {e}")))?;
        let certificate = reqwest::Certificate::from_pem(&ca)
            .map_err(|e| PodListError::Credentials(format!("ca.crt: {e}")))?;

        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| PodListError::Credentials("KUBERNETES_SERVICE_HOST unset".into()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| PodListError::Credentials("KUBERNETES_SERVICE_PORT unset".into()))?;

        let client = reqwest::blocking::Client::builder()
            .add_root_certificate(certificate)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: format!("https://{host}:{port}"),
            token: token.trim().to_string(),
        })
    }

    /// Lister against an explicit API endpoint. Used by tests.
    pub fn with_endpoint(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Namespace this process runs in, from the service-account mount.
    pub fn current_namespace() -> Result<String, PodListError> {
        std::fs::read_to_string(Path::new(SERVICE_ACCOUNT_DIR).join("namespace"))
            .map(|ns| ns.trim().to_string())
            .map_err(|e| PodListError::Credentials(format!("namespace: {e}")))
    }
}

impl PodLister for ClusterPodLister {
    fn list_live_instance_names(&self, namespace: &str) -> Result<Vec<String>, PodListError> {
        let url = format!("{}/api/v1/namespaces/{}/pods", self.base_url, namespace);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(PodListError::Status(status.as_u16()));
        }

        let pods: PodList = response
            .json()
            .map_err(|e| PodListError::Malformed(e.to_string()))?;
        let names: Vec<String> = pods.items.into_iter().map(|p| p.metadata.name).collect();
        debug!(namespace, count = names.len(), "Listed live pods");
        Ok(names)
    }
}
