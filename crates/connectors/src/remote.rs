//! Remote-session connector: pairs with a wallet through a relay service.
//!
//! State machine: `Idle → ModalOpen → AwaitingApproval → {Established |
//! TimedOut | Rejected}`. Polling stops on approval, on the user closing
//! the surface, on [`RemoteSessionConnector::cancel_pairing`], or when the
//! timeout expires.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use walletgate_protocol::constants::{EIP155_NAMESPACE, PAIRING_POLL_INTERVAL, PAIRING_TIMEOUT};
use walletgate_protocol::{
    ChainId, ConnectError, ConnectResult, Connection, ConnectorInfo, NamespacedAccount,
};

use crate::connector::Connector;
use crate::pairing::{
    AppMetadata, PairingPoll, PairingRequest, PairingService, PairingSurface, RemoteSession,
    recommended_mobile_wallets,
};

/// Where a pairing attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    Idle,
    ModalOpen,
    AwaitingApproval,
    Established,
    TimedOut,
    Rejected,
    /// The relay could not open a surface, or the session was unusable.
    Failed,
}

impl PairingState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PairingState::Established
                | PairingState::TimedOut
                | PairingState::Rejected
                | PairingState::Failed
        )
    }
}

/// An established session and its parsed primary account.
struct SessionHandle {
    session: Arc<dyn RemoteSession>,
    account: NamespacedAccount,
}

/// How a polling loop ended without a session.
enum PollExit {
    TimedOut,
    Closed,
    Cancelled,
}

/// Connector for wallets reachable only through a pairing relay.
pub struct RemoteSessionConnector {
    info: ConnectorInfo,
    project_id: Option<String>,
    metadata: AppMetadata,
    chains: Vec<ChainId>,
    service: Arc<dyn PairingService>,
    poll_interval: Duration,
    timeout: Duration,
    state: Mutex<PairingState>,
    session: Mutex<Option<SessionHandle>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl RemoteSessionConnector {
    pub fn new(
        info: ConnectorInfo,
        project_id: Option<String>,
        metadata: AppMetadata,
        service: Arc<dyn PairingService>,
    ) -> Self {
        Self {
            info,
            project_id,
            metadata,
            chains: vec![1],
            service,
            poll_interval: PAIRING_POLL_INTERVAL,
            timeout: PAIRING_TIMEOUT,
            state: Mutex::new(PairingState::Idle),
            session: Mutex::new(None),
            cancel: Mutex::new(None),
        }
    }

    /// The WalletConnect connector.
    pub fn walletconnect(
        project_id: Option<String>,
        metadata: AppMetadata,
        service: Arc<dyn PairingService>,
    ) -> Self {
        let info = ConnectorInfo {
            id: "walletconnect".into(),
            name: "WalletConnect".into(),
            icon_url: Some(
                "https://assets.coingecko.com/coins/images/279/small/ethereum.png".into(),
            ),
            icon_background: Some("#3396ff".into()),
            download_url: Some("https://walletconnect.com/".into()),
            description: Some("Connect to any wallet with WalletConnect".into()),
            mobile: true,
            desktop: true,
            extension: false,
        };
        Self::new(info, project_id, metadata, service)
    }

    /// Overrides the target network set sent to the relay.
    pub fn with_chains(mut self, chains: Vec<ChainId>) -> Self {
        self.chains = chains;
        self
    }

    pub fn pairing_state(&self) -> PairingState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Abandons an in-flight pairing. Returns false if none was running.
    pub fn cancel_pairing(&self) -> bool {
        match self.cancel.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// True while an established session is held and still active.
    pub fn is_connected(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| h.session.is_active())
    }

    pub fn account(&self) -> Option<String> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| h.account.address.clone())
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| h.account.chain_id)
    }

    fn set_state(&self, state: PairingState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
        debug!(connector = %self.info.id, state = ?state, "pairing state");
    }

    fn take_session(&self) -> Option<SessionHandle> {
        self.session.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Polls the surface until a session appears or the attempt ends.
    async fn await_session(
        &self,
        surface: &mut dyn PairingSurface,
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn RemoteSession>, PollExit> {
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollExit::Cancelled),
                _ = &mut deadline => return Err(PollExit::TimedOut),
                _ = ticker.tick() => match surface.poll() {
                    PairingPoll::Pending => {}
                    PairingPoll::Approved(session) => return Ok(session),
                    PairingPoll::Closed => return Err(PollExit::Closed),
                },
            }
        }
    }

    /// Parses the first account of a fresh session and keeps the handle.
    fn establish(&self, session: Arc<dyn RemoteSession>) -> ConnectResult {
        let accounts = session.accounts();
        let Some(first) = accounts.first() else {
            return Err(ConnectError::SessionEstablishmentFailed(
                "session has no accounts".into(),
            ));
        };
        let account = first
            .parse::<NamespacedAccount>()
            .map_err(|e| ConnectError::SessionEstablishmentFailed(e.to_string()))?;
        if account.namespace != EIP155_NAMESPACE {
            return Err(ConnectError::SessionEstablishmentFailed(format!(
                "unsupported account namespace: {}",
                account.namespace
            )));
        }

        let connection = Connection::new(account.address.clone(), Some(account.chain_id))?;
        info!(
            connector = %self.info.id,
            topic = %session.topic(),
            chain_id = account.chain_id,
            "remote session established"
        );
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(SessionHandle { session, account });
        Ok(connection)
    }
}

#[async_trait]
impl Connector for RemoteSessionConnector {
    fn info(&self) -> &ConnectorInfo {
        &self.info
    }

    /// Nothing to install: pairing works through QR codes and links.
    fn installed(&self) -> bool {
        true
    }

    async fn is_available(&self) -> Result<bool, ConnectError> {
        Ok(true)
    }

    async fn connect(&self) -> ConnectResult {
        let Some(project_id) = self
            .project_id
            .as_deref()
            .filter(|p| !p.trim().is_empty())
        else {
            return Err(ConnectError::ConfigurationError(
                "project id required".into(),
            ));
        };

        // A previous session is replaced, never leaked.
        if let Some(old) = self.take_session()
            && let Err(e) = old.session.disconnect().await
        {
            warn!(connector = %self.info.id, error = %e, "failed to end previous session");
        }

        let request = PairingRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            chains: self.chains.clone(),
            metadata: self.metadata.clone(),
            mobile_wallets: recommended_mobile_wallets(),
        };

        self.set_state(PairingState::ModalOpen);
        let mut surface = match self.service.open(&request).await {
            Ok(s) => s,
            Err(e) => {
                warn!(connector = %self.info.id, request = %request.request_id, error = %e, "failed to open pairing surface");
                self.set_state(PairingState::Failed);
                return Err(ConnectError::ConnectionFailed(e.to_string()));
            }
        };
        info!(
            connector = %self.info.id,
            request = %request.request_id,
            uri = %surface.uri(),
            "pairing surface open"
        );

        let cancel = CancellationToken::new();
        if let Some(stale) = self
            .cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(cancel.clone())
        {
            stale.cancel();
        }

        self.set_state(PairingState::AwaitingApproval);
        let outcome = self.await_session(surface.as_mut(), &cancel).await;
        self.cancel.lock().unwrap_or_else(|e| e.into_inner()).take();

        let session = match outcome {
            Ok(session) => session,
            Err(exit) => {
                surface.close().await;
                return Err(match exit {
                    PollExit::TimedOut => {
                        warn!(connector = %self.info.id, request = %request.request_id, "pairing timed out");
                        self.set_state(PairingState::TimedOut);
                        ConnectError::ConnectionTimeout
                    }
                    PollExit::Closed | PollExit::Cancelled => {
                        self.set_state(PairingState::Rejected);
                        ConnectError::UserRejected
                    }
                });
            }
        };

        match self.establish(session.clone()) {
            Ok(connection) => {
                self.set_state(PairingState::Established);
                Ok(connection)
            }
            Err(e) => {
                if let Err(te) = session.disconnect().await {
                    warn!(connector = %self.info.id, error = %te, "failed to end unusable session");
                }
                self.set_state(PairingState::Failed);
                Err(e)
            }
        }
    }

    async fn disconnect(&self) -> Result<(), ConnectError> {
        let handle = self.take_session();
        self.set_state(PairingState::Idle);
        match handle {
            Some(handle) => handle
                .session
                .disconnect()
                .await
                .map_err(|e| ConnectError::ConnectionFailed(e.to_string())),
            None => Ok(()),
        }
    }
}
