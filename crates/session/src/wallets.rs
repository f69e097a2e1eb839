//! Advisory list of wallets a caller can offer.

use std::sync::Arc;

use tracing::debug;

use walletgate_connectors::ConnectorRegistry;
use walletgate_protocol::ConnectorInfo;

/// Registry connectors that reported available, followed by custom entries
/// supplied by the caller. Recomputed on [`refresh`](Self::refresh); never
/// consulted by the store.
pub struct AvailableWallets {
    registry: Arc<ConnectorRegistry>,
    detected: Vec<ConnectorInfo>,
    custom: Vec<ConnectorInfo>,
}

impl AvailableWallets {
    pub fn new(registry: Arc<ConnectorRegistry>) -> Self {
        Self {
            registry,
            detected: Vec::new(),
            custom: Vec::new(),
        }
    }

    /// Re-probes the registry.
    pub async fn refresh(&mut self) -> Vec<ConnectorInfo> {
        self.detected = self
            .registry
            .list_available()
            .await
            .iter()
            .map(|c| c.info().clone())
            .collect();
        debug!(available = self.detected.len(), "wallet list refreshed");
        self.list()
    }

    /// Adds a caller-supplied entry, replacing one with the same id.
    pub fn add(&mut self, info: ConnectorInfo) {
        match self.custom.iter_mut().find(|w| w.id == info.id) {
            Some(existing) => *existing = info,
            None => self.custom.push(info),
        }
    }

    /// Removes an entry from the list. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.detected.len() + self.custom.len();
        self.detected.retain(|w| w.id != id);
        self.custom.retain(|w| w.id != id);
        before != self.detected.len() + self.custom.len()
    }

    /// Detected entries first, then custom ones not already listed.
    pub fn list(&self) -> Vec<ConnectorInfo> {
        let mut wallets = self.detected.clone();
        for custom in &self.custom {
            if !wallets.iter().any(|w| w.id == custom.id) {
                wallets.push(custom.clone());
            }
        }
        wallets
    }
}
