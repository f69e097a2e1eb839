//! Wallet connection configuration.
//!
//! Stored as camelCase JSON at `<config dir>/walletgate/config.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use walletgate_connectors::{AppMetadata, ConnectorRegistry, Environment, PairingService};
use walletgate_protocol::{ChainConfig, ChainTable, default_chains};

/// Errors from loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletConfig {
    /// Relay project credential; the remote-session connector is only
    /// offered when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub app_name: String,
    pub app_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
    pub chains: Vec<ChainConfig>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        let metadata = AppMetadata::default();
        Self {
            project_id: None,
            app_name: metadata.name,
            app_description: metadata.description,
            app_icon: None,
            app_url: None,
            chains: default_chains(),
        }
    }
}

impl WalletConfig {
    /// Loads configuration from `path`.
    ///
    /// A missing file yields defaults; so does an unparsable one, with a
    /// warning.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no wallet config, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<WalletConfig>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse wallet config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "wallet config saved");
        Ok(())
    }

    pub fn has_project_id(&self) -> bool {
        self.project_id
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }

    /// Identity presented to remote wallets during pairing.
    pub fn app_metadata(&self) -> AppMetadata {
        AppMetadata {
            name: self.app_name.clone(),
            description: self.app_description.clone(),
            url: self.app_url.clone(),
            icon: self.app_icon.clone(),
        }
    }

    pub fn chain_table(&self) -> ChainTable {
        ChainTable::new(self.chains.clone())
    }

    /// Registry with the built-in connectors for this configuration.
    pub fn registry(
        &self,
        env: Arc<dyn Environment>,
        pairing: Arc<dyn PairingService>,
    ) -> ConnectorRegistry {
        ConnectorRegistry::with_defaults(
            env,
            pairing,
            self.project_id.as_deref(),
            self.app_metadata(),
        )
    }
}

/// Default location of the config file, if a config directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("walletgate").join("config.json"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".config"))
    }
}
