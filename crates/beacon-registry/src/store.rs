//! In-memory service registry.
//!
//! One `DashMap` entry per function; the value is the function's whole
//! instance set and is always replaced as a unit. That keeps concurrent
//! queries safe without a read-path lock and makes an upsert racing an
//! expiration sweep resolve on the next sweep instead of deadlocking the
//! two paths against each other.

use std::collections::HashSet;

use dashmap::DashMap;
use tracing::{debug, warn};

use beacon_types::Instance;

use crate::error::{RegistryError, Result};

/// Function name -> instances currently announcing themselves.
///
/// Within one function no two instances share a name; an upsert under an
/// existing name supersedes the old record wholesale.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    functions: DashMap<String, Vec<Instance>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            functions: DashMap::new(),
        }
    }

    /// Insert or replace `instance` in `function`'s set.
    ///
    /// Rejects malformed input without touching state. The post-condition
    /// is verified against the replacement set while the entry guard is
    /// still held: exactly one instance with this name, equal to the
    /// input. A failed verification leaves the stored set untouched.
    pub fn upsert(&self, function: &str, instance: Instance) -> Result<()> {
        if function.trim().is_empty() {
            return Err(RegistryError::Validation {
                function: function.to_string(),
                reason: "empty function name".to_string(),
            });
        }
        if !instance.is_valid() {
            return Err(RegistryError::Validation {
                function: function.to_string(),
                reason: format!(
                    "instance {:?} needs a non-empty name and host and a non-zero port",
                    instance.name
                ),
            });
        }

        let name = instance.name.clone();
        let mut entry = self.functions.entry(function.to_string()).or_default();
        let mut next: Vec<Instance> =
            entry.iter().filter(|s| s.name != name).cloned().collect();
        if next.len() == entry.len() {
            debug!(function, instance = %name, "Registering new instance");
        } else {
            debug!(function, instance = %name, "Superseding existing instance");
        }
        next.push(instance.clone());

        // Post-condition, checked under the same guard as the swap:
        // exactly one record under this name, equal to the input.
        let matching: Vec<&Instance> = next.iter().filter(|s| s.name == name).collect();
        if matching.len() != 1 || matching[0] != &instance {
            return Err(RegistryError::Inconsistent {
                function: function.to_string(),
                name,
            });
        }

        *entry = next;
        Ok(())
    }

    /// Instances currently registered for `function`. Empty when the
    /// function is unknown; the two cases are deliberately
    /// indistinguishable.
    pub fn query(&self, function: &str) -> Vec<Instance> {
        match self.functions.get(function) {
            Some(entry) => entry.clone(),
            None => {
                warn!(function, "No registrations for function");
                Vec::new()
            }
        }
    }

    /// Drop every instance whose name is absent from the live snapshot.
    ///
    /// Replaces each function's set as a whole; idempotent for a given
    /// snapshot.
    pub fn apply_liveness(&self, live_names: &HashSet<String>) {
        self.functions.alter_all(|function, services| {
            let before = services.len();
            let kept: Vec<Instance> = services
                .into_iter()
                .filter(|s| live_names.contains(&s.name))
                .collect();
            if kept.len() != before {
                debug!(
                    function,
                    expired = before - kept.len(),
                    remaining = kept.len(),
                    "Expired instances absent from live inventory"
                );
            }
            kept
        });
    }

    /// Function names currently present (including emptied ones).
    pub fn functions(&self) -> Vec<String> {
        self.functions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Drop all registrations. Used by tests and operator tooling.
    pub fn clear(&self) {
        self.functions.clear();
    }
}
