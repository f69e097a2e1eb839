//! Scripted doubles for the environment, provider, pairing relay and
//! connector seams. Enabled for this crate's tests and, through the
//! `test-support` feature, for downstream crates' tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

use walletgate_protocol::constants::{METHOD_CHAIN_ID, METHOD_REQUEST_ACCOUNTS};
use walletgate_protocol::{
    ChainId, ConnectError, ConnectResult, Connection, ConnectorInfo, ProviderEventKind,
};

use crate::connector::{AccountsListener, ChainListener, Connector, ProviderEvents};
use crate::environment::{
    Environment, EventListener, InjectedProvider, ListenerId, NavigationError, ProviderAvailability,
    ProviderError,
};
use crate::pairing::{
    PairingError, PairingPoll, PairingRequest, PairingService, PairingSurface, RemoteSession,
};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Injected provider + environment
// ---------------------------------------------------------------------------

/// In-memory EIP-1193 style provider with scripted responses.
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<HashMap<String, Result<Value, ProviderError>>>,
    requests: Mutex<Vec<(String, Option<Value>)>>,
    listeners: Mutex<Vec<(ListenerId, ProviderEventKind, EventListener)>>,
    next_id: AtomicU64,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that authorizes `accounts` on the chain `chain_hex`.
    pub fn with_accounts(accounts: &[&str], chain_hex: &str) -> Self {
        let provider = Self::new();
        provider.respond(METHOD_REQUEST_ACCOUNTS, Ok(json!(accounts)));
        provider.respond(METHOD_CHAIN_ID, Ok(json!(chain_hex)));
        provider
    }

    pub fn respond(&self, method: &str, response: Result<Value, ProviderError>) {
        lock(&self.responses).insert(method.to_string(), response);
    }

    /// Methods requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn last_params(&self, method: &str) -> Option<Value> {
        lock(&self.requests)
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .and_then(|(_, p)| p.clone())
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Delivers `payload` to every listener registered for `kind`.
    pub fn emit(&self, kind: ProviderEventKind, payload: Value) {
        let targets: Vec<EventListener> = lock(&self.listeners)
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, l)| l.clone())
            .collect();
        for listener in targets {
            listener(payload.clone());
        }
    }
}

#[async_trait]
impl InjectedProvider for MockProvider {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ProviderError> {
        lock(&self.requests).push((method.to_string(), params));
        lock(&self.responses)
            .get(method)
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::new(-32601, format!("{method} not supported"))))
    }

    fn on(&self, event: ProviderEventKind, listener: EventListener) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.listeners).push((id, event, listener));
        id
    }

    fn remove_listener(&self, event: ProviderEventKind, id: ListenerId) {
        lock(&self.listeners).retain(|(lid, k, _)| !(*lid == id && *k == event));
    }
}

/// Host environment with a settable probe verdict.
pub struct MockEnvironment {
    availability: Mutex<ProviderAvailability>,
    page_url: String,
    navigations: Mutex<Vec<String>>,
    blocks_navigation: bool,
}

impl MockEnvironment {
    pub fn new(availability: ProviderAvailability) -> Self {
        Self {
            availability: Mutex::new(availability),
            page_url: "https://dapp.example/".into(),
            navigations: Mutex::new(Vec::new()),
            blocks_navigation: false,
        }
    }

    pub fn extension(provider: Arc<MockProvider>) -> Self {
        Self::new(ProviderAvailability::Extension(provider))
    }

    /// A mobile browser without a provider, currently showing `page_url`.
    pub fn mobile(page_url: &str) -> Self {
        Self {
            page_url: page_url.to_string(),
            ..Self::new(ProviderAvailability::MobileDeepLink)
        }
    }

    /// Every `open_external` call fails.
    pub fn blocking_navigation(mut self) -> Self {
        self.blocks_navigation = true;
        self
    }

    pub fn set_availability(&self, availability: ProviderAvailability) {
        *lock(&self.availability) = availability;
    }

    /// URLs passed to `open_external`.
    pub fn navigations(&self) -> Vec<String> {
        lock(&self.navigations).clone()
    }
}

impl Environment for MockEnvironment {
    fn detect(&self) -> ProviderAvailability {
        lock(&self.availability).clone()
    }

    fn page_url(&self) -> String {
        self.page_url.clone()
    }

    fn open_external(&self, url: &str) -> Result<(), NavigationError> {
        if self.blocks_navigation {
            return Err(NavigationError {
                url: url.to_string(),
                reason: "popup blocked".into(),
            });
        }
        lock(&self.navigations).push(url.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pairing relay
// ---------------------------------------------------------------------------

/// How the next opened surface behaves when polled.
#[derive(Debug, Clone)]
pub enum SurfaceScript {
    /// Stays pending forever.
    Never,
    /// Approves after `polls` pending polls with a session holding `accounts`.
    ApproveAfter { polls: usize, accounts: Vec<String> },
    /// The user closes the surface after `polls` pending polls.
    CloseAfter { polls: usize },
}

/// Remote session double.
pub struct MockSession {
    topic: String,
    accounts: Vec<String>,
    active: AtomicBool,
    fail_disconnect: bool,
    disconnects: AtomicUsize,
}

impl MockSession {
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSession for MockSession {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn accounts(&self) -> Vec<String> {
        self.accounts.clone()
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), PairingError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(PairingError::Relay("relay unreachable".into()));
        }
        Ok(())
    }
}

struct MockSurface {
    uri: String,
    script: SurfaceScript,
    polls: usize,
    session: Arc<MockSession>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl PairingSurface for MockSurface {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn poll(&mut self) -> PairingPoll {
        let seen = self.polls;
        self.polls += 1;
        match &self.script {
            SurfaceScript::Never => PairingPoll::Pending,
            SurfaceScript::ApproveAfter { polls, .. } if seen >= *polls => {
                PairingPoll::Approved(self.session.clone())
            }
            SurfaceScript::CloseAfter { polls } if seen >= *polls => PairingPoll::Closed,
            _ => PairingPoll::Pending,
        }
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pairing relay that opens scripted surfaces.
pub struct MockPairingService {
    script: SurfaceScript,
    open_error: Option<String>,
    session: Arc<MockSession>,
    requests: Mutex<Vec<PairingRequest>>,
    closed: Arc<AtomicUsize>,
}

impl MockPairingService {
    pub fn new(script: SurfaceScript) -> Self {
        let accounts = match &script {
            SurfaceScript::ApproveAfter { accounts, .. } => accounts.clone(),
            _ => Vec::new(),
        };
        Self {
            script,
            open_error: None,
            session: Arc::new(MockSession {
                topic: "topic-1".into(),
                accounts,
                active: AtomicBool::new(true),
                fail_disconnect: false,
                disconnects: AtomicUsize::new(0),
            }),
            requests: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A relay whose `open` always fails with `message`.
    pub fn failing_open(message: &str) -> Self {
        Self {
            open_error: Some(message.to_string()),
            ..Self::new(SurfaceScript::Never)
        }
    }

    pub fn with_failing_disconnect(self) -> Self {
        let accounts = self.session.accounts.clone();
        Self {
            session: Arc::new(MockSession {
                topic: "topic-1".into(),
                accounts,
                active: AtomicBool::new(true),
                fail_disconnect: true,
                disconnects: AtomicUsize::new(0),
            }),
            ..self
        }
    }

    pub fn session(&self) -> Arc<MockSession> {
        self.session.clone()
    }

    pub fn open_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn last_request(&self) -> Option<PairingRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Surfaces closed without approval.
    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PairingService for MockPairingService {
    async fn open(&self, request: &PairingRequest) -> Result<Box<dyn PairingSurface>, PairingError> {
        lock(&self.requests).push(request.clone());
        if let Some(message) = &self.open_error {
            return Err(PairingError::Relay(message.clone()));
        }
        Ok(Box::new(MockSurface {
            uri: format!("wc:{}@2?relay-protocol=irn", request.request_id),
            script: self.script.clone(),
            polls: 0,
            session: self.session.clone(),
            closed: self.closed.clone(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// A connector whose every answer is scripted.
///
/// `connect` returns the configured outcome; with [`gated`] it first waits
/// for [`release`], so callers can observe the in-flight window.
///
/// [`gated`]: ScriptedConnector::gated
/// [`release`]: ScriptedConnector::release
pub struct ScriptedConnector {
    info: ConnectorInfo,
    outcome: Mutex<ConnectResult>,
    available: bool,
    probe_error: Option<ConnectError>,
    gate: Option<Notify>,
    fail_disconnect: bool,
    network_switch: bool,
    switch_gate: Option<Notify>,
    switch_outcomes: Mutex<VecDeque<Result<(), ConnectError>>>,
    emits_events: bool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    switched: Mutex<Vec<ChainId>>,
    accounts_listeners: Mutex<Vec<AccountsListener>>,
    chain_listeners: Mutex<Vec<ChainListener>>,
}

impl ScriptedConnector {
    pub const ACCOUNT: &'static str = "0x1111111111111111111111111111111111111111";

    /// Succeeds with [`Self::ACCOUNT`] on chain 1.
    pub fn new(id: &str) -> Self {
        Self {
            info: ConnectorInfo::new(id, id),
            outcome: Mutex::new(Connection::new(Self::ACCOUNT, Some(1))),
            available: true,
            probe_error: None,
            gate: None,
            fail_disconnect: false,
            network_switch: false,
            switch_gate: None,
            switch_outcomes: Mutex::new(VecDeque::new()),
            emits_events: true,
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            switched: Mutex::new(Vec::new()),
            accounts_listeners: Mutex::new(Vec::new()),
            chain_listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.info.name = name.to_string();
        self
    }

    pub fn succeeding(self, account: &str, chain_id: Option<ChainId>) -> Self {
        self.set_outcome(Connection::new(account, chain_id));
        self
    }

    pub fn failing(self, err: ConnectError) -> Self {
        self.set_outcome(Err(err));
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn with_probe_error(mut self, err: ConnectError) -> Self {
        self.probe_error = Some(err);
        self
    }

    pub fn with_failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    pub fn with_network_switch(mut self) -> Self {
        self.network_switch = true;
        self
    }

    /// `switch_network` waits for [`release_switch`](Self::release_switch)
    /// after recording the requested chain.
    pub fn with_gated_switch(mut self) -> Self {
        self.switch_gate = Some(Notify::new());
        self
    }

    pub fn without_events(mut self) -> Self {
        self.emits_events = false;
        self
    }

    pub fn set_outcome(&self, outcome: ConnectResult) {
        *lock(&self.outcome) = outcome;
    }

    /// Queues the result of the next `switch_network` call.
    pub fn push_switch_outcome(&self, outcome: Result<(), ConnectError>) {
        lock(&self.switch_outcomes).push_back(outcome);
    }

    /// Lets one gated `connect` call finish.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Lets one gated `switch_network` call finish.
    pub fn release_switch(&self) {
        if let Some(gate) = &self.switch_gate {
            gate.notify_one();
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn switched_chains(&self) -> Vec<ChainId> {
        lock(&self.switched).clone()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.accounts_listeners).len() + lock(&self.chain_listeners).len()
    }

    pub fn emit_accounts(&self, accounts: &[&str]) {
        let accounts: Vec<String> = accounts.iter().map(|a| a.to_string()).collect();
        let listeners = lock(&self.accounts_listeners).clone();
        for listener in listeners {
            listener(accounts.clone());
        }
    }

    pub fn emit_chain(&self, chain_hex: &str) {
        let listeners = lock(&self.chain_listeners).clone();
        for listener in listeners {
            listener(chain_hex.to_string());
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn info(&self) -> &ConnectorInfo {
        &self.info
    }

    fn installed(&self) -> bool {
        self.available
    }

    async fn is_available(&self) -> Result<bool, ConnectError> {
        match &self.probe_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.available),
        }
    }

    async fn connect(&self) -> ConnectResult {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        lock(&self.outcome).clone()
    }

    async fn disconnect(&self) -> Result<(), ConnectError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(ConnectError::ConnectionFailed("backend unreachable".into()));
        }
        Ok(())
    }

    fn supports_network_switch(&self) -> bool {
        self.network_switch
    }

    async fn switch_network(&self, chain_id: ChainId) -> Result<(), ConnectError> {
        if !self.network_switch {
            return Err(ConnectError::NetworkSwitchUnsupported);
        }
        lock(&self.switched).push(chain_id);
        if let Some(gate) = &self.switch_gate {
            gate.notified().await;
        }
        lock(&self.switch_outcomes).pop_front().unwrap_or(Ok(()))
    }

    fn events(&self) -> Option<&dyn ProviderEvents> {
        if self.emits_events { Some(self) } else { None }
    }
}

impl ProviderEvents for ScriptedConnector {
    fn on_accounts_changed(&self, listener: AccountsListener) {
        lock(&self.accounts_listeners).push(listener);
    }

    fn on_chain_changed(&self, listener: ChainListener) {
        lock(&self.chain_listeners).push(listener);
    }

    fn remove_listeners(&self) {
        lock(&self.accounts_listeners).clear();
        lock(&self.chain_listeners).clear();
    }
}
