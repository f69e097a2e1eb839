//! Injected-provider connector (browser extension, wallet webview, mobile
//! deep link).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use walletgate_protocol::constants::{
    METAMASK_DEEP_LINK_BASE, METHOD_CHAIN_ID, METHOD_REQUEST_ACCOUNTS, METHOD_SWITCH_CHAIN,
};
use walletgate_protocol::{
    ChainId, ConnectError, ConnectResult, Connection, ConnectorInfo, ProviderEventKind,
    parse_hex_chain_id, to_hex_chain_id,
};

use crate::connector::{AccountsListener, ChainListener, Connector, ProviderEvents};
use crate::environment::{
    Environment, InjectedProvider, ListenerId, ProviderAvailability, ProviderError,
};

/// Listener registrations made through this connector, kept so they can be
/// detached from the same provider they were attached to.
type Registration = (Arc<dyn InjectedProvider>, ProviderEventKind, ListenerId);

/// Connector for a wallet injected into the caller's environment.
pub struct InjectedConnector {
    info: ConnectorInfo,
    env: Arc<dyn Environment>,
    deep_link_base: String,
    registrations: Mutex<Vec<Registration>>,
}

impl InjectedConnector {
    pub fn new(info: ConnectorInfo, env: Arc<dyn Environment>, deep_link_base: &str) -> Self {
        Self {
            info,
            env,
            deep_link_base: deep_link_base.to_string(),
            registrations: Mutex::new(Vec::new()),
        }
    }

    /// The MetaMask connector: extension, in-app browser and mobile deep link.
    pub fn metamask(env: Arc<dyn Environment>) -> Self {
        let info = ConnectorInfo {
            id: "metamask".into(),
            name: "MetaMask".into(),
            icon_url: Some(
                "https://assets.coingecko.com/coins/images/279/small/ethereum.png".into(),
            ),
            icon_background: Some("#f6851b".into()),
            download_url: Some("https://metamask.io/download/".into()),
            description: Some("The most popular Ethereum wallet".into()),
            mobile: true,
            desktop: true,
            extension: true,
        };
        Self::new(info, env, METAMASK_DEEP_LINK_BASE)
    }

    /// Deep link that reopens the current page inside the wallet app.
    pub fn deep_link(&self) -> String {
        format!(
            "{}{}",
            self.deep_link_base,
            urlencoding::encode(&self.env.page_url())
        )
    }

    async fn handshake(&self, provider: &dyn InjectedProvider) -> ConnectResult {
        let accounts = provider
            .request(METHOD_REQUEST_ACCOUNTS, None)
            .await
            .map_err(classify)?;
        let accounts = parse_accounts(accounts)
            .map_err(|e| ConnectError::ConnectionFailed(format!("invalid accounts response: {e}")))?;

        let Some(account) = accounts.into_iter().next() else {
            return Err(ConnectError::ProviderNotFound("No accounts found".into()));
        };

        let chain = provider
            .request(METHOD_CHAIN_ID, None)
            .await
            .map_err(classify)?;
        let chain_hex = chain.as_str().ok_or_else(|| {
            ConnectError::ConnectionFailed(format!("invalid chain id response: {chain}"))
        })?;
        let chain_id = parse_hex_chain_id(chain_hex)
            .map_err(|e| ConnectError::ConnectionFailed(e.to_string()))?;

        Connection::new(account, Some(chain_id))
    }

    fn redirect(&self) -> ConnectResult {
        let url = self.deep_link();
        info!(connector = %self.info.id, url = %url, "redirecting to mobile wallet");
        self.env
            .open_external(&url)
            .map_err(|e| ConnectError::ConnectionFailed(format!("failed to open wallet app: {e}")))?;
        Err(ConnectError::Redirecting {
            app: self.info.name.clone(),
            url,
        })
    }

    fn register(&self, provider: Arc<dyn InjectedProvider>, kind: ProviderEventKind, id: ListenerId) {
        self.registrations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((provider, kind, id));
    }
}

#[async_trait]
impl Connector for InjectedConnector {
    fn info(&self) -> &ConnectorInfo {
        &self.info
    }

    fn installed(&self) -> bool {
        self.env.detect().is_installed()
    }

    async fn is_available(&self) -> Result<bool, ConnectError> {
        Ok(self.env.detect().is_available())
    }

    async fn connect(&self) -> ConnectResult {
        let verdict = self.env.detect();
        debug!(connector = %self.info.id, verdict = ?verdict, "connecting");
        match verdict {
            ProviderAvailability::EmbeddedBrowser(provider)
            | ProviderAvailability::Extension(provider) => self.handshake(provider.as_ref()).await,
            ProviderAvailability::MobileDeepLink => self.redirect(),
            ProviderAvailability::Unavailable => Err(ConnectError::ProviderNotFound(format!(
                "{name} not found. Please install {name} extension or use {name} mobile app.",
                name = self.info.name
            ))),
        }
    }

    async fn disconnect(&self) -> Result<(), ConnectError> {
        // No remote session to end; only local listeners are released.
        self.remove_listeners();
        debug!(connector = %self.info.id, "disconnect: cleared local state");
        Ok(())
    }

    fn supports_network_switch(&self) -> bool {
        self.env.detect().is_installed()
    }

    async fn switch_network(&self, chain_id: ChainId) -> Result<(), ConnectError> {
        let verdict = self.env.detect();
        let provider = verdict
            .provider()
            .ok_or(ConnectError::NetworkSwitchUnsupported)?;
        let params = json!([{ "chainId": to_hex_chain_id(chain_id) }]);
        provider
            .request(METHOD_SWITCH_CHAIN, Some(params))
            .await
            .map_err(classify)?;
        Ok(())
    }

    fn events(&self) -> Option<&dyn ProviderEvents> {
        Some(self)
    }
}

impl ProviderEvents for InjectedConnector {
    fn on_accounts_changed(&self, listener: AccountsListener) {
        let verdict = self.env.detect();
        let Some(provider) = verdict.provider() else {
            return;
        };
        let id = provider.on(
            ProviderEventKind::AccountsChanged,
            Arc::new(move |payload: Value| match parse_accounts(payload) {
                Ok(accounts) => listener(accounts),
                Err(e) => warn!("ignoring malformed accountsChanged payload: {e}"),
            }),
        );
        self.register(provider.clone(), ProviderEventKind::AccountsChanged, id);
    }

    fn on_chain_changed(&self, listener: ChainListener) {
        let verdict = self.env.detect();
        let Some(provider) = verdict.provider() else {
            return;
        };
        let id = provider.on(
            ProviderEventKind::ChainChanged,
            Arc::new(move |payload: Value| match payload {
                Value::String(chain) => listener(chain),
                other => warn!("ignoring malformed chainChanged payload: {other}"),
            }),
        );
        self.register(provider.clone(), ProviderEventKind::ChainChanged, id);
    }

    fn remove_listeners(&self) {
        let drained: Vec<Registration> = self
            .registrations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for (provider, kind, id) in drained {
            provider.remove_listener(kind, id);
        }
    }
}

/// Maps a provider failure onto the connector error taxonomy.
fn classify(err: ProviderError) -> ConnectError {
    if err.is_user_rejection() {
        ConnectError::UserRejected
    } else {
        ConnectError::ConnectionFailed(err.message)
    }
}

/// Accounts arrive as a JSON array of strings; `null` means none.
fn parse_accounts(value: Value) -> Result<Vec<String>, serde_json::Error> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
}
