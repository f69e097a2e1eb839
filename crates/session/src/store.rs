//! Connection state store.
//!
//! The single writer of connection state. `connect`, `disconnect`,
//! `switch_network` and `reset` are the mutation entry points; the event
//! bridge applies backend notifications through the same lock. Each commit
//! is published as one [`ConnectionSnapshot`].
//!
//! Every connection carries a generation number. `disconnect`, `reset` and
//! a successful `connect` advance it, so results of operations started
//! against an older generation are discarded instead of applied.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use walletgate_connectors::{Connector, ConnectorRegistry};
use walletgate_protocol::{ChainId, ConnectError, Connection};

use crate::bridge::{self, BridgeSubscription};
use crate::types::{ConnectionSnapshot, StoreError};

#[derive(Default)]
struct StoreState {
    active: Option<Arc<dyn Connector>>,
    account: Option<String>,
    chain_id: Option<ChainId>,
    is_connected: bool,
    is_connecting: bool,
    /// Connector id of the handshake in flight.
    connecting: Option<String>,
    error: Option<String>,
    generation: u64,
    bridge: Option<BridgeSubscription>,
}

impl StoreState {
    /// While a handshake is in flight the previous connection, if any, stays
    /// in place but is not reported as connected.
    fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            account: self.account.clone(),
            chain_id: self.chain_id,
            is_connected: self.is_connected && !self.is_connecting,
            is_connecting: self.is_connecting,
            error: self.error.clone(),
            active_connector: self.active.as_ref().map(|c| c.id().to_string()),
        }
    }

    /// Returns to the initial state, handing back what must be released.
    fn clear(&mut self) -> (Option<Arc<dyn Connector>>, Option<BridgeSubscription>) {
        self.generation += 1;
        self.account = None;
        self.chain_id = None;
        self.is_connected = false;
        self.is_connecting = false;
        self.connecting = None;
        self.error = None;
        (self.active.take(), self.bridge.take())
    }

    /// Whether `id` is the active connector or the one being connected.
    fn uses(&self, id: &str) -> bool {
        self.active.as_ref().is_some_and(|a| a.id() == id)
            || self.connecting.as_deref() == Some(id)
    }
}

/// State shared between the store handle and bridge forwarders.
pub(crate) struct Shared {
    state: Mutex<StoreState>,
    snapshot_tx: watch::Sender<ConnectionSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: &StoreState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }

    /// Tears down the active connection and resets state.
    ///
    /// With `expected`, does nothing unless that generation is still
    /// current. Returns whether a reset happened.
    pub(crate) async fn disconnect(&self, expected: Option<u64>) -> bool {
        let (connector, bridge) = {
            let mut state = self.lock();
            if let Some(generation) = expected
                && state.generation != generation
            {
                return false;
            }
            let released = state.clear();
            self.publish(&state);
            released
        };
        drop(bridge);

        if let Some(connector) = connector {
            match connector.disconnect().await {
                Ok(()) => debug!(connector = %connector.id(), "backend disconnected"),
                Err(e) => warn!(connector = %connector.id(), error = %e, "backend disconnect failed"),
            }
        }
        true
    }

    pub(crate) fn update_account(&self, generation: u64, account: String) -> bool {
        let mut state = self.lock();
        if state.generation != generation || !state.is_connected {
            return false;
        }
        if state.account.as_deref() != Some(account.as_str()) {
            debug!(account = %account, "account changed");
            state.account = Some(account);
            self.publish(&state);
        }
        true
    }

    pub(crate) fn update_chain(&self, generation: u64, chain_id: ChainId) -> bool {
        let mut state = self.lock();
        if state.generation != generation || !state.is_connected {
            return false;
        }
        if state.chain_id != Some(chain_id) {
            debug!(chain_id, "chain changed");
            state.chain_id = Some(chain_id);
            self.publish(&state);
        }
        true
    }
}

/// Clears `is_connecting` if a `connect` call is dropped before settling.
struct ConnectingGuard<'a> {
    shared: &'a Shared,
    generation: u64,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if state.generation == self.generation && state.is_connecting {
            debug!("connect abandoned before settling");
            state.is_connecting = false;
            state.connecting = None;
            self.shared.publish(&state);
        }
    }
}

/// How a settled handshake was committed.
enum Settled {
    Connected {
        connection: Connection,
        replaced: Option<Arc<dyn Connector>>,
    },
    Failed(ConnectError),
    Stale {
        /// The handshake succeeded but nothing else uses this connector.
        teardown: bool,
    },
}

/// The authoritative connection state for one application session.
pub struct ConnectionStore {
    registry: Arc<ConnectorRegistry>,
    shared: Arc<Shared>,
}

impl ConnectionStore {
    pub fn new(registry: Arc<ConnectorRegistry>) -> Self {
        let (snapshot_tx, _) = watch::channel(ConnectionSnapshot::default());
        Self {
            registry,
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState::default()),
                snapshot_tx,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectorRegistry> {
        &self.registry
    }

    /// Current state.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Receiver notified on every committed state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn active_connector(&self) -> Option<Arc<dyn Connector>> {
        self.shared.lock().active.clone()
    }

    /// Current connection generation.
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    /// Connects through the connector registered as `id`.
    ///
    /// Fails without touching state if `id` is unknown or another connect
    /// is in flight. Handshake failures are recorded in the error slot.
    pub async fn connect(&self, id: &str) -> Result<Connection, StoreError> {
        let connector = self.registry.get(id)?;

        let generation = {
            let mut state = self.shared.lock();
            if state.is_connecting {
                return Err(StoreError::OperationInProgress);
            }
            state.is_connecting = true;
            state.connecting = Some(connector.id().to_string());
            state.error = None;
            self.shared.publish(&state);
            state.generation
        };
        let _guard = ConnectingGuard {
            shared: &self.shared,
            generation,
        };

        info!(connector = %id, "connecting");
        let result = connector.connect().await;

        let settled = {
            let mut state = self.shared.lock();
            if state.generation != generation {
                Settled::Stale {
                    teardown: result.is_ok() && !state.uses(connector.id()),
                }
            } else {
                match result {
                    Ok(connection) => {
                        state.generation += 1;
                        let replaced = state.active.replace(connector.clone());
                        // Release before attaching: the new connector may be
                        // the same object as the old one.
                        drop(state.bridge.take());
                        state.account = Some(connection.account().to_string());
                        state.chain_id = connection.chain_id();
                        state.is_connected = true;
                        state.is_connecting = false;
                        state.connecting = None;
                        state.error = None;
                        state.bridge = bridge::attach(
                            connector.clone(),
                            state.generation,
                            Arc::downgrade(&self.shared),
                        );
                        self.shared.publish(&state);
                        Settled::Connected {
                            connection,
                            replaced: replaced.filter(|r| r.id() != connector.id()),
                        }
                    }
                    Err(e) => {
                        state.is_connecting = false;
                        state.connecting = None;
                        state.error = Some(e.to_string());
                        self.shared.publish(&state);
                        Settled::Failed(e)
                    }
                }
            }
        };

        match settled {
            Settled::Connected {
                connection,
                replaced,
            } => {
                info!(
                    connector = %id,
                    account = %connection.account(),
                    chain_id = ?connection.chain_id(),
                    "connected"
                );
                if let Some(previous) = replaced
                    && let Err(e) = previous.disconnect().await
                {
                    warn!(connector = %previous.id(), error = %e, "failed to release replaced connector");
                }
                Ok(connection)
            }
            Settled::Failed(e) => {
                if e.is_user_rejection() {
                    info!(connector = %id, "connection rejected by user");
                } else {
                    warn!(connector = %id, error = %e, "connection failed");
                }
                Err(StoreError::Connect(e))
            }
            Settled::Stale { teardown } => {
                debug!(connector = %id, "connect result discarded");
                if teardown && let Err(e) = connector.disconnect().await {
                    warn!(connector = %id, error = %e, "failed to release discarded connection");
                }
                Err(StoreError::Superseded)
            }
        }
    }

    /// Tears down the active connection. Always succeeds; backend teardown
    /// errors are logged.
    pub async fn disconnect(&self) {
        self.shared.disconnect(None).await;
        info!("disconnected");
    }

    /// Asks the active backend to move to `chain_id`.
    pub async fn switch_network(&self, chain_id: ChainId) -> Result<(), StoreError> {
        let (connector, generation) = {
            let state = self.shared.lock();
            let connector = state
                .active
                .clone()
                .ok_or(StoreError::NoActiveConnection)?;
            (connector, state.generation)
        };
        if !connector.supports_network_switch() {
            return Err(ConnectError::NetworkSwitchUnsupported.into());
        }

        let result = connector.switch_network(chain_id).await;

        let mut state = self.shared.lock();
        if state.generation != generation {
            debug!(chain_id, "network switch result discarded");
            return Err(StoreError::Superseded);
        }
        match result {
            Ok(()) => {
                state.chain_id = Some(chain_id);
                self.shared.publish(&state);
                info!(connector = %connector.id(), chain_id, "network switched");
                Ok(())
            }
            Err(e) => {
                state.error = Some(e.to_string());
                self.shared.publish(&state);
                warn!(connector = %connector.id(), chain_id, error = %e, "network switch failed");
                Err(e.into())
            }
        }
    }

    /// Returns to the initial state without contacting the backend.
    pub fn reset(&self) {
        let (_, bridge) = {
            let mut state = self.shared.lock();
            let released = state.clear();
            self.shared.publish(&state);
            released
        };
        drop(bridge);
        debug!("store reset");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use walletgate_connectors::test_support::{
        MockEnvironment, MockPairingService, MockProvider, ScriptedConnector, SurfaceScript,
    };
    use walletgate_connectors::{AppMetadata, InjectedConnector, RegistryError, RemoteSessionConnector};

    const ACCOUNT: &str = ScriptedConnector::ACCOUNT;
    const OTHER: &str = "0x2222222222222222222222222222222222222222";

    fn store_with(connectors: Vec<Arc<dyn Connector>>) -> ConnectionStore {
        let registry = Arc::new(ConnectorRegistry::new());
        for connector in connectors {
            registry.register(connector);
        }
        ConnectionStore::new(registry)
    }

    fn assert_reset(snap: &ConnectionSnapshot) {
        assert!(!snap.is_connected);
        assert!(!snap.is_connecting);
        assert!(snap.account.is_none());
        assert!(snap.chain_id.is_none());
        assert!(snap.active_connector.is_none());
        assert!(snap.error.is_none());
    }

    /// Waits until the snapshot satisfies `pred` (bridge updates land on a
    /// spawned task).
    async fn wait_for(store: &ConnectionStore, pred: impl FnMut(&ConnectionSnapshot) -> bool) {
        let mut rx = store.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
            .await
            .expect("state never reached")
            .unwrap();
    }

    #[tokio::test]
    async fn initial_state_is_disconnected() {
        let store = store_with(vec![]);
        assert_reset(&store.snapshot());
        assert!(store.active_connector().is_none());
        assert!(store.registry().is_empty());
    }

    #[tokio::test]
    async fn connect_commits_account_and_chain() {
        let connector = Arc::new(ScriptedConnector::new("wallet"));
        let store = store_with(vec![connector.clone()]);

        let conn = store.connect("wallet").await.unwrap();
        assert_eq!(conn.account(), ACCOUNT);

        let snap = store.snapshot();
        assert!(snap.is_connected);
        assert!(!snap.is_connecting);
        assert_eq!(snap.account.as_deref(), Some(ACCOUNT));
        assert_eq!(snap.chain_id, Some(1));
        assert_eq!(snap.active_connector.as_deref(), Some("wallet"));
        assert_eq!(store.active_connector().unwrap().id(), "wallet");
        assert_eq!(connector.listener_count(), 2);
    }

    #[tokio::test]
    async fn injected_handshake_end_to_end() {
        let provider = Arc::new(MockProvider::with_accounts(&[ACCOUNT], "0x1"));
        let env = Arc::new(MockEnvironment::extension(provider.clone()));
        let store = store_with(vec![Arc::new(InjectedConnector::metamask(env))]);

        store.connect("metamask").await.unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.account.as_deref(), Some(ACCOUNT));
        assert_eq!(snap.chain_id, Some(1));
        assert!(snap.is_connected);
        assert!(!snap.is_connecting);
        assert_eq!(provider.listener_count(), 2);

        store.disconnect().await;
        assert_eq!(provider.listener_count(), 0);
    }

    #[tokio::test]
    async fn mobile_redirect_stays_disconnected() {
        let env = Arc::new(MockEnvironment::mobile("https://dapp.example/"));
        let store = store_with(vec![Arc::new(InjectedConnector::metamask(env.clone()))]);

        let err = store.connect("metamask").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Connect(ConnectError::Redirecting { .. })
        ));
        assert_eq!(env.navigations().len(), 1);

        let snap = store.snapshot();
        assert!(!snap.is_connected);
        assert!(!snap.is_connecting);
        assert_eq!(snap.error.as_deref(), Some("Redirecting to MetaMask mobile app..."));
    }

    #[tokio::test]
    async fn unknown_connector_leaves_state_untouched() {
        let store = store_with(vec![Arc::new(ScriptedConnector::new("wallet"))]);
        store.connect("wallet").await.unwrap();
        let before = store.snapshot();

        let err = store.connect("ledger").await.unwrap_err();
        assert_eq!(
            err,
            StoreError::ConnectorNotRegistered(RegistryError::NotRegistered("ledger".into()))
        );
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn failure_is_recorded_and_cleared_by_next_connect() {
        let connector = Arc::new(ScriptedConnector::new("wallet").failing(ConnectError::UserRejected));
        let store = store_with(vec![connector.clone()]);

        let err = store.connect("wallet").await.unwrap_err();
        assert_eq!(err, StoreError::Connect(ConnectError::UserRejected));
        let snap = store.snapshot();
        assert_eq!(snap.error.as_deref(), Some("User rejected connection"));
        assert!(!snap.is_connected);
        assert!(!snap.is_connecting);

        connector.set_outcome(Connection::new(ACCOUNT, Some(137)));
        store.connect("wallet").await.unwrap();
        let snap = store.snapshot();
        assert!(snap.error.is_none());
        assert_eq!(snap.chain_id, Some(137));
    }

    #[tokio::test]
    async fn reentrant_connect_is_rejected() {
        let connector = Arc::new(ScriptedConnector::new("wallet").gated());
        let store = Arc::new(store_with(vec![connector.clone()]));

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.connect("wallet").await })
        };
        wait_for(&store, |s| s.is_connecting).await;
        let during = store.snapshot();

        let err = store.connect("wallet").await.unwrap_err();
        assert_eq!(err, StoreError::OperationInProgress);
        assert_eq!(store.snapshot(), during);
        assert_eq!(connector.connect_count(), 1);

        connector.release();
        first.await.unwrap().unwrap();
        assert!(store.snapshot().is_connected);
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_from_every_state_resets() {
        // Already disconnected.
        let store = store_with(vec![Arc::new(ScriptedConnector::new("wallet"))]);
        store.disconnect().await;
        assert_reset(&store.snapshot());

        // Connected.
        store.connect("wallet").await.unwrap();
        store.disconnect().await;
        assert_reset(&store.snapshot());

        // Connected through a backend whose teardown fails.
        let failing = Arc::new(ScriptedConnector::new("flaky").with_failing_disconnect());
        let store = store_with(vec![failing.clone()]);
        store.connect("flaky").await.unwrap();
        store.disconnect().await;
        assert_reset(&store.snapshot());
        assert_eq!(failing.disconnect_count(), 1);

        // With an error in the slot.
        let store = store_with(vec![Arc::new(
            ScriptedConnector::new("bad").failing(ConnectError::ConnectionTimeout),
        )]);
        let _ = store.connect("bad").await;
        store.disconnect().await;
        assert_reset(&store.snapshot());
    }

    #[tokio::test]
    async fn disconnect_while_connecting_discards_result() {
        let connector = Arc::new(ScriptedConnector::new("wallet").gated());
        let store = Arc::new(store_with(vec![connector.clone()]));

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.connect("wallet").await })
        };
        wait_for(&store, |s| s.is_connecting).await;

        store.disconnect().await;
        assert_reset(&store.snapshot());

        connector.release();
        assert_eq!(pending.await.unwrap().unwrap_err(), StoreError::Superseded);
        assert_reset(&store.snapshot());
        // The orphaned handshake is released.
        assert_eq!(connector.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn discarded_handshake_released_while_other_connector_connects() {
        let first = Arc::new(ScriptedConnector::new("first").gated());
        let second = Arc::new(ScriptedConnector::new("second").gated());
        let store = Arc::new(store_with(vec![first.clone(), second.clone()]));

        let pending_first = {
            let store = store.clone();
            tokio::spawn(async move { store.connect("first").await })
        };
        wait_for(&store, |s| s.is_connecting).await;
        store.disconnect().await;

        let pending_second = {
            let store = store.clone();
            tokio::spawn(async move { store.connect("second").await })
        };
        wait_for(&store, |s| s.is_connecting).await;

        first.release();
        assert_eq!(
            pending_first.await.unwrap().unwrap_err(),
            StoreError::Superseded
        );
        assert_eq!(first.disconnect_count(), 1);
        // The other handshake is unaffected.
        assert!(store.snapshot().is_connecting);

        second.release();
        pending_second.await.unwrap().unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.active_connector.as_deref(), Some("second"));
        assert!(snap.is_connected);
        assert_eq!(first.disconnect_count(), 1);
        assert_eq!(second.disconnect_count(), 0);
    }

    #[tokio::test]
    async fn discarded_handshake_kept_when_same_connector_reconnects() {
        let connector = Arc::new(ScriptedConnector::new("wallet").gated());
        let store = Arc::new(store_with(vec![connector.clone()]));

        let stale = {
            let store = store.clone();
            tokio::spawn(async move { store.connect("wallet").await })
        };
        wait_for(&store, |s| s.is_connecting).await;
        store.disconnect().await;

        let fresh = {
            let store = store.clone();
            tokio::spawn(async move { store.connect("wallet").await })
        };
        wait_for(&store, |s| s.is_connecting).await;

        connector.release();
        connector.release();
        let (stale, fresh) = (stale.await.unwrap(), fresh.await.unwrap());
        assert_eq!(stale.unwrap_err(), StoreError::Superseded);
        fresh.unwrap();
        assert!(store.snapshot().is_connected);
        assert_eq!(connector.disconnect_count(), 0);
    }

    #[tokio::test]
    async fn dropped_connect_clears_connecting() {
        let connector = Arc::new(ScriptedConnector::new("wallet").gated());
        let store = Arc::new(store_with(vec![connector]));

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.connect("wallet").await })
        };
        wait_for(&store, |s| s.is_connecting).await;

        pending.abort();
        let _ = pending.await;
        assert!(!store.snapshot().is_connecting);
        assert_reset(&store.snapshot());
    }

    #[tokio::test]
    async fn new_connection_replaces_previous() {
        let first = Arc::new(ScriptedConnector::new("first"));
        let second = Arc::new(ScriptedConnector::new("second").succeeding(OTHER, Some(56)));
        let store = store_with(vec![first.clone(), second.clone()]);

        store.connect("first").await.unwrap();
        let generation = store.generation();
        store.connect("second").await.unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.active_connector.as_deref(), Some("second"));
        assert_eq!(snap.account.as_deref(), Some(OTHER));
        assert_eq!(snap.chain_id, Some(56));
        assert!(store.generation() > generation);

        // Old bridge and backend released, new bridge attached.
        assert_eq!(first.listener_count(), 0);
        assert_eq!(first.disconnect_count(), 1);
        assert_eq!(second.listener_count(), 2);

        // Events from the replaced backend no longer reach the store.
        first.emit_accounts(&[]);
        tokio::task::yield_now().await;
        assert!(store.snapshot().is_connected);
    }

    #[tokio::test]
    async fn reconnecting_same_connector_keeps_listeners() {
        let connector = Arc::new(ScriptedConnector::new("wallet"));
        let store = store_with(vec![connector.clone()]);

        store.connect("wallet").await.unwrap();
        store.connect("wallet").await.unwrap();
        assert_eq!(connector.listener_count(), 2);
        assert_eq!(connector.disconnect_count(), 0);
    }

    #[tokio::test]
    async fn connect_while_connected_hides_connected_flag() {
        let connector = Arc::new(ScriptedConnector::new("wallet"));
        let gated = Arc::new(
            ScriptedConnector::new("slow")
                .gated()
                .failing(ConnectError::UserRejected),
        );
        let store = Arc::new(store_with(vec![connector.clone(), gated.clone()]));
        store.connect("wallet").await.unwrap();

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.connect("slow").await })
        };
        wait_for(&store, |s| s.is_connecting).await;
        let during = store.snapshot();
        assert!(!during.is_connected);
        assert_eq!(during.active_connector.as_deref(), Some("wallet"));

        gated.release();
        assert!(pending.await.unwrap().is_err());

        // The previous connection survives a failed replacement attempt.
        let after = store.snapshot();
        assert!(after.is_connected);
        assert_eq!(after.active_connector.as_deref(), Some("wallet"));
        assert_eq!(after.error.as_deref(), Some("User rejected connection"));
    }

    #[tokio::test]
    async fn switch_network_without_connection() {
        let store = store_with(vec![Arc::new(ScriptedConnector::new("wallet"))]);
        let before = store.snapshot();

        assert_eq!(
            store.switch_network(137).await.unwrap_err(),
            StoreError::NoActiveConnection
        );
        assert_eq!(store.snapshot(), before);
        assert!(store.snapshot().chain_id.is_none());
    }

    #[tokio::test]
    async fn switch_network_updates_chain_only() {
        let connector = Arc::new(ScriptedConnector::new("wallet").with_network_switch());
        let store = store_with(vec![connector.clone()]);
        store.connect("wallet").await.unwrap();
        let before = store.snapshot();

        store.switch_network(137).await.unwrap();
        let after = store.snapshot();
        assert_eq!(after.chain_id, Some(137));
        assert_eq!(
            ConnectionSnapshot {
                chain_id: before.chain_id,
                ..after
            },
            before
        );
        assert_eq!(connector.switched_chains(), vec![137]);
    }

    #[tokio::test]
    async fn switch_network_unsupported() {
        let store = store_with(vec![Arc::new(ScriptedConnector::new("wallet"))]);
        store.connect("wallet").await.unwrap();

        assert_eq!(
            store.switch_network(56).await.unwrap_err(),
            StoreError::Connect(ConnectError::NetworkSwitchUnsupported)
        );
        assert_eq!(store.snapshot().chain_id, Some(1));
    }

    #[tokio::test]
    async fn switch_network_failure_is_recorded() {
        let connector = Arc::new(ScriptedConnector::new("wallet").with_network_switch());
        connector.push_switch_outcome(Err(ConnectError::UserRejected));
        let store = store_with(vec![connector]);
        store.connect("wallet").await.unwrap();

        assert!(store.switch_network(56).await.is_err());
        let snap = store.snapshot();
        assert_eq!(snap.chain_id, Some(1));
        assert!(snap.is_connected);
        assert_eq!(snap.error.as_deref(), Some("User rejected connection"));
    }

    #[tokio::test]
    async fn disconnect_during_switch_discards_result() {
        let connector = Arc::new(
            ScriptedConnector::new("wallet")
                .with_network_switch()
                .with_gated_switch(),
        );
        let store = Arc::new(store_with(vec![connector.clone()]));
        store.connect("wallet").await.unwrap();

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.switch_network(137).await })
        };
        while connector.switched_chains().is_empty() {
            tokio::task::yield_now().await;
        }

        store.disconnect().await;
        connector.release_switch();
        assert_eq!(pending.await.unwrap().unwrap_err(), StoreError::Superseded);
        assert_reset(&store.snapshot());
        assert_eq!(store.snapshot().chain_id, None);
    }

    #[tokio::test]
    async fn reset_returns_to_initial_state() {
        let connector = Arc::new(ScriptedConnector::new("wallet"));
        let store = store_with(vec![connector.clone()]);
        store.connect("wallet").await.unwrap();

        store.reset();
        assert_reset(&store.snapshot());
        assert_eq!(connector.listener_count(), 0);
        // Reset never contacts the backend.
        assert_eq!(connector.disconnect_count(), 0);
    }

    #[tokio::test]
    async fn connected_implies_account_in_every_snapshot() {
        let ok = Arc::new(ScriptedConnector::new("ok"));
        let bad = Arc::new(ScriptedConnector::new("bad").failing(ConnectError::ConnectionTimeout));
        let store = Arc::new(store_with(vec![ok, bad]));

        let mut rx = store.subscribe();
        let watcher = tokio::spawn(async move {
            let mut seen = 0usize;
            while rx.changed().await.is_ok() {
                let snap = rx.borrow_and_update().clone();
                assert!(!snap.is_connected || snap.account.is_some());
                assert!(!snap.is_connected || snap.active_connector.is_some());
                assert!(!(snap.is_connected && snap.is_connecting));
                seen += 1;
            }
            seen
        });

        for id in ["ok", "bad", "ok", "ok", "bad"] {
            let _ = store.connect(id).await;
            tokio::task::yield_now().await;
            if id == "bad" {
                store.disconnect().await;
            }
        }
        store.disconnect().await;
        drop(store);
        assert!(watcher.await.unwrap() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_session_timeout_leaves_disconnected() {
        let service = Arc::new(MockPairingService::new(SurfaceScript::Never));
        let remote = RemoteSessionConnector::walletconnect(
            Some("project".into()),
            AppMetadata::default(),
            service,
        );
        let store = store_with(vec![Arc::new(remote)]);

        let err = store.connect("walletconnect").await.unwrap_err();
        assert_eq!(err, StoreError::Connect(ConnectError::ConnectionTimeout));
        let snap = store.snapshot();
        assert!(!snap.is_connected);
        assert!(!snap.is_connecting);
        assert_eq!(snap.error.as_deref(), Some("Connection timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_session_commits_parsed_account() {
        let service = Arc::new(MockPairingService::new(SurfaceScript::ApproveAfter {
            polls: 2,
            accounts: vec!["eip155:137:0xABCDEF0123456789abcdef0123456789ABCDEF01".into()],
        }));
        let remote = RemoteSessionConnector::walletconnect(
            Some("project".into()),
            AppMetadata::default(),
            service.clone(),
        );
        let store = store_with(vec![Arc::new(remote)]);

        store.connect("walletconnect").await.unwrap();
        let snap = store.snapshot();
        assert_eq!(
            snap.account.as_deref(),
            Some("0xABCDEF0123456789abcdef0123456789ABCDEF01")
        );
        assert_eq!(snap.chain_id, Some(137));

        store.disconnect().await;
        assert_eq!(service.session().disconnect_count(), 1);
    }
}
