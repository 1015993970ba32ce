//! Registration envelope for the registry endpoint.

use crate::instance::Instance;
use serde::{Deserialize, Serialize};

/// Body of `PUT /registrations` and `GET /registrations`.
///
/// For an upsert the `services` array must hold exactly one instance; the
/// endpoint rejects zero or many. For a query only `function` is read, and
/// the response reuses the same envelope with the registered instances
/// filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    /// Logical function the instances provide, e.g. "chat".
    pub function: String,

    /// Registered instances of the function.
    #[serde(default)]
    pub services: Vec<Instance>,
}

impl Registration {
    /// Envelope announcing a single instance of `function`.
    pub fn announce(function: impl Into<String>, instance: Instance) -> Self {
        Self {
            function: function.into(),
            services: vec![instance],
        }
    }

    /// Query envelope carrying only the function name.
    pub fn query(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            services: Vec::new(),
        }
    }
}
