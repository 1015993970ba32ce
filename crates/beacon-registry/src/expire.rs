//! Liveness expiration engine.
//!
//! Periodically reconciles the registry against the cluster's live-pod
//! inventory: any registered instance whose name no longer appears in the
//! inventory is dropped. Inventory failures are contained; the engine
//! retries a few times within a tick and otherwise waits for the next one.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::podlist::PodLister;
use crate::store::ServiceRegistry;

/// Expiration engine tuning.
#[derive(Debug, Clone)]
pub struct ExpirationConfig {
    /// Time between sweeps.
    pub interval: Duration,

    /// Namespace whose pods count as alive.
    pub namespace: String,

    /// Immediate retries after a failed inventory fetch, before giving up
    /// until the next scheduled tick.
    pub max_retries: u32,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            namespace: "default".to_string(),
            max_retries: 3,
        }
    }
}

/// Periodic sweep task handle. Stopped until `start()`; `stop()` disposes
/// the timer so no tick fires afterwards; `restart()` is stop-then-start
/// and safe to call when never started.
pub struct ExpirationEngine {
    config: ExpirationConfig,
    registry: Arc<ServiceRegistry>,
    lister: Arc<dyn PodLister>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExpirationEngine {
    pub fn new(
        config: ExpirationConfig,
        registry: Arc<ServiceRegistry>,
        lister: Arc<dyn PodLister>,
    ) -> Self {
        Self {
            config,
            registry,
            lister,
            task: Mutex::new(None),
        }
    }

    /// Arm the periodic sweep. Any previously armed timer is disposed
    /// first, so a repeated `start()` never double-ticks.
    pub fn start(&self) {
        let mut slot = self.task.lock().expect("expiration task lock");
        if let Some(previous) = slot.take() {
            warn!("Expiration engine already running, rearming");
            previous.abort();
        }

        info!(
            interval_secs = self.config.interval.as_secs(),
            namespace = %self.config.namespace,
            "Starting expiration engine"
        );

        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);
        let lister = Arc::clone(&self.lister);
        *slot = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            // An interval's first tick completes immediately; the first
            // sweep belongs one full period out.
            interval.tick().await;
            loop {
                interval.tick().await;
                debug!("Registrations expiration tick");
                if registry.is_empty() {
                    debug!("Registry empty, skipping sweep");
                    continue;
                }
                sweep(&registry, &lister, &config).await;
            }
        }));
    }

    /// Dispose the timer. In-flight inventory fetches may finish but
    /// cannot re-arm the schedule.
    pub fn stop(&self) {
        let mut slot = self.task.lock().expect("expiration task lock");
        match slot.take() {
            Some(task) => {
                task.abort();
                info!("Stopped expiration engine");
            }
            None => debug!("Expiration engine was not running"),
        }
    }

    /// Stop-then-start. Safe when the engine was never started.
    pub fn restart(&self) {
        self.stop();
        self.start();
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .expect("expiration task lock")
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ExpirationEngine {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

/// One sweep: fetch the inventory off the runtime threads, apply it to
/// the registry. Failures are logged and retried up to the configured cap.
async fn sweep(registry: &Arc<ServiceRegistry>, lister: &Arc<dyn PodLister>, config: &ExpirationConfig) {
    let attempts = config.max_retries.saturating_add(1);
    for attempt in 1..=attempts {
        let lister = Arc::clone(lister);
        let namespace = config.namespace.clone();
        let fetched =
            tokio::task::spawn_blocking(move || lister.list_live_instance_names(&namespace)).await;

        match fetched {
            Ok(Ok(names)) => {
                let live: HashSet<String> = names.into_iter().collect();
                debug!(live = live.len(), "Applying liveness snapshot");
                registry.apply_liveness(&live);
                return;
            }
            Ok(Err(e)) => {
                warn!(attempt, error = %e, "Pod inventory fetch failed");
            }
            Err(e) => {
                warn!(attempt, error = %e, "Pod inventory task failed");
            }
        }
    }
    error!(
        attempts,
        "Pod inventory unavailable, keeping registrations until next tick"
    );
}
