//! Shared connection set with a published size snapshot.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::watch;
use tracing::error;

/// Tracks open connections. Every add/remove happens under one lock and
/// publishes the new set size through a watch channel, so a shutdown
/// sequence can await emptiness instead of polling.
#[derive(Debug)]
pub struct ConnectionTracker {
    connections: Mutex<HashSet<u64>>,
    size_tx: watch::Sender<usize>,
    next_id: AtomicU64,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTracker {
    pub fn new() -> Self {
        let (size_tx, _) = watch::channel(0);
        Self {
            connections: Mutex::new(HashSet::new()),
            size_tx,
            next_id: AtomicU64::new(0),
        }
    }

    /// Track a newly accepted connection, returning its id.
    pub fn add(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut connections = self.connections.lock().expect("connection set lock");
        if !connections.insert(id) {
            error!(id, "Connection already tracked");
        }
        let _ = self.size_tx.send(connections.len());
        id
    }

    /// Forget a closed connection.
    pub fn remove(&self, id: u64) {
        let mut connections = self.connections.lock().expect("connection set lock");
        if !connections.remove(&id) {
            error!(id, "Cannot remove untracked connection");
        }
        let _ = self.size_tx.send(connections.len());
    }

    pub fn len(&self) -> usize {
        self.connections.lock().expect("connection set lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observe set-size snapshots.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.size_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_publishes_size() {
        let tracker = ConnectionTracker::new();
        let mut rx = tracker.subscribe();
        assert_eq!(*rx.borrow(), 0);

        let a = tracker.add();
        let b = tracker.add();
        assert_eq!(tracker.len(), 2);
        assert_eq!(*rx.borrow_and_update(), 2);

        tracker.remove(a);
        tracker.remove(b);
        assert!(tracker.is_empty());
        assert_eq!(*rx.borrow_and_update(), 0);
    }

    #[test]
    fn ids_are_unique() {
        let tracker = ConnectionTracker::new();
        let a = tracker.add();
        let b = tracker.add();
        assert_ne!(a, b);
    }
}
