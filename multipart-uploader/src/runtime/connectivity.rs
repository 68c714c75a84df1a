/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Source of truth for whether the network is reachable.
///
/// The scheduler asks [`is_online`](Connectivity::is_online) before dispatching each part and
/// an in-flight transfer watches [`subscribe`](Connectivity::subscribe) so it can be cancelled as
/// soon as connectivity drops.
pub trait Connectivity: Send + Sync + fmt::Debug {
    /// Whether connectivity is currently believed to be available
    fn is_online(&self) -> bool;

    /// Subscribe to connectivity changes. The channel carries `true` while online.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Shared [`Connectivity`] implementation
pub type SharedConnectivity = Arc<dyn Connectivity>;

/// A settable connectivity signal.
///
/// Cloning yields another handle onto the same signal, so an application can keep one clone to
/// report network changes while the upload client holds another.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    /// Create a monitor that starts out online
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Create a monitor with the given initial state
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Report a change in connectivity
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        tracing::debug!(online, "connectivity updated");
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::online()
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Resolves once `rx` reports offline. Never resolves if the sender goes away.
pub(crate) async fn wait_offline(mut rx: watch::Receiver<bool>) {
    let observed = rx.wait_for(|online| !*online).await.map(|_| ());
    if observed.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{wait_offline, Connectivity, ConnectivityMonitor};

    #[tokio::test]
    async fn test_wait_offline_resolves_on_drop_in_connectivity() {
        let monitor = ConnectivityMonitor::online();
        let waiter = tokio::spawn(wait_offline(monitor.subscribe()));
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        monitor.set_online(false);
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("offline observed")
            .unwrap();
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_clones_share_signal() {
        let monitor = ConnectivityMonitor::online();
        let reporter = monitor.clone();
        reporter.set_online(false);
        assert!(!monitor.is_online());
    }
}
