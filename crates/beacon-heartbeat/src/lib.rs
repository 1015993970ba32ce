//! Beacon heartbeat client
//!
//! Runs inside each worker process and periodically announces the
//! worker's own instance record to the registry endpoint. Attempts are
//! strictly serialized: the next upsert never starts before the previous
//! one settled (success, failure, or timeout). Failures are soft; the
//! loop keeps its fixed cadence until `stop()`.

#![deny(unsafe_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use beacon_types::{Instance, Registration};

/// Default wait between heartbeats.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default budget for one upsert attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(1500);

/// Heartbeat client errors.
#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("Heartbeat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Registry rejected heartbeat with status {0}")]
    Rejected(u16),

    #[error("Failed to build heartbeat client: {0}")]
    Client(reqwest::Error),
}

/// Heartbeat client configuration.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Registry endpoint host.
    pub registry_host: String,

    /// Registry endpoint port.
    pub registry_port: u16,

    /// Fixed wait between attempts, independent of attempt duration.
    pub interval: Duration,

    /// Budget for a single upsert attempt.
    pub attempt_timeout: Duration,
}

impl HeartbeatConfig {
    pub fn new(registry_host: impl Into<String>, registry_port: u16) -> Self {
        Self {
            registry_host: registry_host.into(),
            registry_port,
            interval: DEFAULT_INTERVAL,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    fn registrations_url(&self) -> String {
        format!(
            "http://{}:{}/registrations",
            self.registry_host, self.registry_port
        )
    }
}

/// Periodic announcer of one immutable instance record.
pub struct HeartbeatClient {
    config: HeartbeatConfig,
    function: String,
    instance: Instance,
    client: reqwest::Client,
    task: Mutex<Option<JoinHandle<()>>>,
    stop_tx: watch::Sender<bool>,
}

impl HeartbeatClient {
    /// Build a client announcing `instance` under `function`.
    pub fn new(
        config: HeartbeatConfig,
        function: impl Into<String>,
        instance: Instance,
    ) -> Result<Self, HeartbeatError> {
        let client = reqwest::Client::builder()
            .timeout(config.attempt_timeout)
            .build()
            .map_err(HeartbeatError::Client)?;
        let (stop_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            function: function.into(),
            instance,
            client,
            task: Mutex::new(None),
            stop_tx,
        })
    }

    /// One upsert attempt with the configured timeout. The announced
    /// record carries a fresh timestamp.
    pub async fn announce_once(&self) -> Result<(), HeartbeatError> {
        let mut record = self.instance.clone();
        record.registered_at = chrono::Utc::now();
        let registration = Registration::announce(self.function.clone(), record);

        let response = self
            .client
            .put(self.config.registrations_url())
            .json(&registration)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(function = %self.function, instance = %self.instance.name, "Heartbeat accepted");
            Ok(())
        } else {
            Err(HeartbeatError::Rejected(status.as_u16()))
        }
    }

    /// Start the heartbeat loop. A second `start()` rearms the loop
    /// without leaving the previous one ticking.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.task.lock().expect("heartbeat task lock");
        if let Some(previous) = slot.take() {
            warn!("Heartbeat loop already running, rearming");
            previous.abort();
        }

        info!(
            function = %self.function,
            instance = %self.instance.name,
            registry = %self.config.registrations_url(),
            interval_secs = self.config.interval.as_secs(),
            "Starting heartbeat loop"
        );

        let this = Arc::clone(self);
        let mut stop_rx = self.stop_tx.subscribe();
        *slot = Some(tokio::spawn(async move {
            loop {
                // One attempt at a time: the send is awaited to
                // settlement before the fixed wait starts.
                match this.announce_once().await {
                    Ok(()) => info!(instance = %this.instance.name, "Service registration refreshed"),
                    Err(e) => warn!(instance = %this.instance.name, error = %e, "Service registration failed"),
                }

                tokio::select! {
                    _ = tokio::time::sleep(this.config.interval) => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Heartbeat loop exited");
        }));
    }

    /// Stop the loop. The current attempt, if any, is abandoned; safe to
    /// call when `start()` never ran.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
        let mut slot = self.task.lock().expect("heartbeat task lock");
        match slot.take() {
            Some(task) => {
                task.abort();
                info!(function = %self.function, "Stopped heartbeat loop");
            }
            None => debug!("Heartbeat loop was not running"),
        }
    }
}

impl Drop for HeartbeatClient {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

/// The worker's own instance record, from the conventional cluster
/// environment: `HOSTNAME` carries the pod name, `POD_IP` the reachable
/// address.
pub fn local_instance(port: u16) -> Option<Instance> {
    let name = std::env::var("HOSTNAME").ok()?;
    let host = std::env::var("POD_IP").ok()?;
    Some(Instance::new(name, host, port))
}
