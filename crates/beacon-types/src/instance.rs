//! Instance value type.
//!
//! An instance is one running worker process providing a function,
//! identified by a unique name (the pod name in cluster deployments) and
//! reachable at host:port. Identity is the `name` alone: a re-registration
//! under the same name replaces the previous record wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One running worker instance of a function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Reachable address of the worker.
    pub host: String,

    /// Unique identity, e.g. the pod name.
    pub name: String,

    /// Port the worker's message endpoint listens on.
    pub port: u16,

    /// When this record was produced by the worker.
    #[serde(rename = "timestamp")]
    pub registered_at: DateTime<Utc>,
}

impl Instance {
    /// Create an instance record stamped with the current time.
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            port,
            registered_at: Utc::now(),
        }
    }

    /// Whether the record is well formed: non-empty name and host, a
    /// usable port.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.host.trim().is_empty() && self.port != 0
    }

    /// `host:port` authority for building request URLs.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Equality is full-value; identity within a registry is by `name` only.
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.host == other.host
            && self.port == other.port
            && self.registered_at == other.registered_at
    }
}

impl Eq for Instance {}
