//! Connectivity signal.
//!
//! The platform's reachability notifications are modeled as a watch
//! channel carrying "is reachable now". A deferred sync subscribes, waits
//! for the first `true`, then drops its receiver; that is the whole
//! one-shot subscription.

use tokio::sync::watch;

/// Source of reachability information.
pub trait ConnectivityMonitor: Send + Sync {
    /// Current reachability.
    fn is_reachable(&self) -> bool;

    /// Subscribe to reachability changes. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// [`ConnectivityMonitor`] backed by a watch channel, fed by whatever
/// platform mechanism the application has.
#[derive(Debug)]
pub struct WatchConnectivity {
    tx: watch::Sender<bool>,
}

impl WatchConnectivity {
    /// Create a monitor with the given initial reachability.
    pub fn new(reachable: bool) -> Self {
        let (tx, _rx) = watch::channel(reachable);
        Self { tx }
    }

    /// Report a reachability change.
    pub fn set_reachable(&self, reachable: bool) {
        self.tx.send_replace(reachable);
    }
}

impl ConnectivityMonitor for WatchConnectivity {
    fn is_reachable(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
