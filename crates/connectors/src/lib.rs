//! Wallet connectors: the connector contract, its injected-provider and
//! remote-session implementations, and the registry that offers them.

pub mod connector;
pub mod environment;
pub mod injected;
pub mod pairing;
pub mod registry;
pub mod remote;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use connector::{AccountsListener, ChainListener, Connector, ProviderEvents};
pub use environment::{
    Environment, EventListener, InjectedProvider, ListenerId, NavigationError, ProviderAvailability,
    ProviderError,
};
pub use injected::InjectedConnector;
pub use pairing::{
    AppMetadata, MobileWallet, PairingError, PairingPoll, PairingRequest, PairingService,
    PairingSurface, RemoteSession, recommended_mobile_wallets,
};
pub use registry::{ConnectorRegistry, RegistryError};
pub use remote::{PairingState, RemoteSessionConnector};
