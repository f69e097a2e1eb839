//! Boundary to the host environment of an injected provider.
//!
//! The host (a browser page, a webview bridge, a test) answers one typed
//! question: which kind of provider, if any, is reachable. Callers never
//! inspect host globals themselves.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use walletgate_protocol::ProviderEventKind;
use walletgate_protocol::constants::USER_REJECTED_CODE;

/// Error returned by an injected provider request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// EIP-1193 rejection code, or a wallet that only reports it in text.
    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED_CODE || self.message.contains("User rejected")
    }
}

/// The host refused or failed to open an external URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot open {url}: {reason}")]
pub struct NavigationError {
    pub url: String,
    pub reason: String,
}

/// Identifies one listener registration on a provider's emitter.
pub type ListenerId = u64;

/// Raw event listener; receives the event payload as emitted.
pub type EventListener = Arc<dyn Fn(Value) + Send + Sync>;

/// Request/response primitive plus event emitter of an in-process wallet.
#[async_trait]
pub trait InjectedProvider: Send + Sync {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ProviderError>;

    fn on(&self, event: ProviderEventKind, listener: EventListener) -> ListenerId;

    fn remove_listener(&self, event: ProviderEventKind, id: ListenerId);
}

/// Typed verdict of probing the host for a provider.
#[derive(Clone)]
pub enum ProviderAvailability {
    /// The host is the wallet's own embedded browser.
    EmbeddedBrowser(Arc<dyn InjectedProvider>),
    /// A compatible provider object was injected (browser extension).
    Extension(Arc<dyn InjectedProvider>),
    /// No provider, but the host is a mobile browser that can deep link.
    MobileDeepLink,
    Unavailable,
}

impl ProviderAvailability {
    pub fn provider(&self) -> Option<&Arc<dyn InjectedProvider>> {
        match self {
            ProviderAvailability::EmbeddedBrowser(p) | ProviderAvailability::Extension(p) => {
                Some(p)
            }
            ProviderAvailability::MobileDeepLink | ProviderAvailability::Unavailable => None,
        }
    }

    /// A provider object is present in-process.
    pub fn is_installed(&self) -> bool {
        self.provider().is_some()
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, ProviderAvailability::Unavailable)
    }
}

impl fmt::Debug for ProviderAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderAvailability::EmbeddedBrowser(_) => write!(f, "EmbeddedBrowser"),
            ProviderAvailability::Extension(_) => write!(f, "Extension"),
            ProviderAvailability::MobileDeepLink => write!(f, "MobileDeepLink"),
            ProviderAvailability::Unavailable => write!(f, "Unavailable"),
        }
    }
}

/// Host capabilities needed by the injected-provider connector.
pub trait Environment: Send + Sync {
    fn detect(&self) -> ProviderAvailability;

    /// Address of the page the caller is running in.
    fn page_url(&self) -> String;

    /// Navigates away from the process (deep link). Control does not return
    /// with a handshake result.
    fn open_external(&self, url: &str) -> Result<(), NavigationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_by_code() {
        assert!(ProviderError::new(4001, "denied").is_user_rejection());
    }

    #[test]
    fn rejection_by_message() {
        assert!(ProviderError::new(-32000, "User rejected the request.").is_user_rejection());
        assert!(!ProviderError::new(-32603, "internal error").is_user_rejection());
    }

    #[test]
    fn availability_flags() {
        assert!(ProviderAvailability::MobileDeepLink.is_available());
        assert!(!ProviderAvailability::MobileDeepLink.is_installed());
        assert!(!ProviderAvailability::Unavailable.is_available());
        assert_eq!(format!("{:?}", ProviderAvailability::Unavailable), "Unavailable");
    }
}
