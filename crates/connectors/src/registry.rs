//! Known connectors and availability probing.

use std::sync::{Arc, RwLock};

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::connector::Connector;
use crate::environment::Environment;
use crate::injected::InjectedConnector;
use crate::pairing::{AppMetadata, PairingService};
use crate::remote::RemoteSessionConnector;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Connector {0} not found")]
    NotRegistered(String),
}

/// Owns the connectors offered to the caller, in registration order.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: RwLock<Vec<Arc<dyn Connector>>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in connectors.
    ///
    /// The remote-session connector needs a relay project id and is left out
    /// when none is configured.
    pub fn with_defaults(
        env: Arc<dyn Environment>,
        pairing: Arc<dyn PairingService>,
        project_id: Option<&str>,
        metadata: AppMetadata,
    ) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(InjectedConnector::metamask(env)));
        match project_id.map(str::trim).filter(|p| !p.is_empty()) {
            Some(project_id) => registry.register(Arc::new(RemoteSessionConnector::walletconnect(
                Some(project_id.to_string()),
                metadata,
                pairing,
            ))),
            None => debug!("no relay project id; walletconnect not registered"),
        }
        registry
    }

    /// Adds a connector; an existing entry with the same id is replaced in
    /// place.
    pub fn register(&self, connector: Arc<dyn Connector>) {
        let mut connectors = self.connectors.write().unwrap_or_else(|e| e.into_inner());
        match connectors.iter_mut().find(|c| c.id() == connector.id()) {
            Some(slot) => *slot = connector,
            None => connectors.push(connector),
        }
    }

    /// Removes a connector. Returns whether it was registered.
    pub fn unregister(&self, id: &str) -> bool {
        let mut connectors = self.connectors.write().unwrap_or_else(|e| e.into_inner());
        let before = connectors.len();
        connectors.retain(|c| c.id() != id);
        connectors.len() != before
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Connector>, RegistryError> {
        self.connectors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|c| c.id() == id)
            .cloned()
            .ok_or_else(|| RegistryError::NotRegistered(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.connectors.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<Arc<dyn Connector>> {
        self.connectors.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.connectors.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Probes every connector concurrently and returns the available ones.
    ///
    /// A failing probe counts as unavailable and never affects the others.
    pub async fn list_available(&self) -> Vec<Arc<dyn Connector>> {
        let connectors = self.all();
        let probes = join_all(connectors.iter().map(|c| c.is_available())).await;

        connectors
            .into_iter()
            .zip(probes)
            .filter_map(|(connector, probe)| match probe {
                Ok(true) => Some(connector),
                Ok(false) => None,
                Err(e) => {
                    warn!(connector = %connector.id(), error = %e, "availability probe failed");
                    None
                }
            })
            .collect()
    }
}
