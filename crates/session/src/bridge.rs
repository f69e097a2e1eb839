//! Event bridge between a connected backend and the store.
//!
//! Backend listeners only enqueue; a forwarder task applies each event to
//! the store, tagged with the generation of the connection it was attached
//! for. Events for a connection that has since been replaced or torn down
//! are dropped.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use walletgate_connectors::Connector;
use walletgate_protocol::parse_hex_chain_id;

use crate::store::Shared;

#[derive(Debug)]
enum BridgeEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
}

/// Listener registration on the active connector. Dropping it detaches the
/// listeners and stops the forwarder.
pub struct BridgeSubscription {
    connector: Arc<dyn Connector>,
    cancel: CancellationToken,
    generation: u64,
}

impl BridgeSubscription {
    pub fn connector_id(&self) -> &str {
        self.connector.id()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for BridgeSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(events) = self.connector.events() {
            events.remove_listeners();
        }
        debug!(
            connector = %self.connector.id(),
            generation = self.generation,
            "event bridge released"
        );
    }
}

/// Attaches to `connector`'s change notifications.
///
/// Returns `None` for backends that emit no events.
pub(crate) fn attach(
    connector: Arc<dyn Connector>,
    generation: u64,
    store: Weak<Shared>,
) -> Option<BridgeSubscription> {
    let Some(events) = connector.events() else {
        debug!(connector = %connector.id(), "backend emits no events; bridge not attached");
        return None;
    };

    // Unbounded: a disconnect notification must never be dropped behind a
    // burst of chain changes.
    let (tx, rx) = mpsc::unbounded_channel();

    let accounts_tx = tx.clone();
    events.on_accounts_changed(Arc::new(move |accounts: Vec<String>| {
        if accounts_tx.send(BridgeEvent::AccountsChanged(accounts)).is_err() {
            trace!("bridge closed, accountsChanged dropped");
        }
    }));
    events.on_chain_changed(Arc::new(move |chain: String| {
        if tx.send(BridgeEvent::ChainChanged(chain)).is_err() {
            trace!("bridge closed, chainChanged dropped");
        }
    }));

    let cancel = CancellationToken::new();
    tokio::spawn(forward(
        rx,
        store,
        generation,
        cancel.clone(),
        connector.id().to_string(),
    ));
    debug!(connector = %connector.id(), generation, "event bridge attached");

    Some(BridgeSubscription {
        connector,
        cancel,
        generation,
    })
}

async fn forward(
    mut rx: mpsc::UnboundedReceiver<BridgeEvent>,
    store: Weak<Shared>,
    generation: u64,
    cancel: CancellationToken,
    connector_id: String,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        trace!(connector = %connector_id, event = ?event, "bridge event");

        let Some(store) = store.upgrade() else {
            break;
        };
        match event {
            BridgeEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
                None => {
                    info!(connector = %connector_id, "wallet reported no accounts, disconnecting");
                    store.disconnect(Some(generation)).await;
                    break;
                }
                Some(account) => {
                    if !store.update_account(generation, account) {
                        debug!(connector = %connector_id, "stale accountsChanged ignored");
                    }
                }
            },
            BridgeEvent::ChainChanged(raw) => match parse_hex_chain_id(&raw) {
                Ok(chain_id) => {
                    if !store.update_chain(generation, chain_id) {
                        debug!(connector = %connector_id, "stale chainChanged ignored");
                    }
                }
                Err(e) => warn!(connector = %connector_id, error = %e, "ignoring chainChanged"),
            },
        }
    }
    trace!(connector = %connector_id, generation, "bridge forwarder stopped");
}
