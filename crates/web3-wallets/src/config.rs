//! Adapter configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;
use web3_wallets_error::{Result, WalletsError};
use web3_wallets_provider::ConfirmationPolicy;
use web3_wallets_traits::SolanaCluster;

/// Default WalletConnect v1 bridge
pub const DEFAULT_BRIDGE_URL: &str = "https://bridge.walletconnect.org";

/// Default domain reverse-lookup service
pub const DEFAULT_DOMAIN_LOOKUP_URL: &str = "https://domains.1inch.io";

/// Default key under which the last wallet choice is persisted
pub const DEFAULT_STORAGE_KEY: &str = "web3-wallets-name";

/// Confirmation polling settings, in plain numbers for config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// First poll interval in milliseconds
    pub initial_interval_ms: u64,
    /// Interval cap in milliseconds
    pub max_interval_ms: u64,
    /// Polls before giving up
    pub max_attempts: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        let policy = ConfirmationPolicy::default();
        Self {
            initial_interval_ms: policy.initial_interval.as_millis() as u64,
            max_interval_ms: policy.max_interval.as_millis() as u64,
            max_attempts: policy.max_attempts,
        }
    }
}

impl ConfirmationConfig {
    /// Polling policy for these settings
    pub fn policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::new()
            .with_initial_interval(Duration::from_millis(self.initial_interval_ms))
            .with_max_interval(Duration::from_millis(self.max_interval_ms))
            .with_max_attempts(self.max_attempts)
    }
}

/// Endpoints and keys used by the controller and its adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletsConfig {
    /// WalletConnect v1 bridge
    pub bridge_url: String,
    /// Base URL of the EVM domain reverse-lookup service
    pub domain_lookup_url: String,
    /// Base URL of the SNS resolution proxy
    pub sns_proxy_url: String,
    /// Storage key for the last wallet choice
    pub storage_key: String,
    /// MetaMask extension install page
    pub metamask_install_url: String,
    /// MetaMask mobile deep link prefix; the page URL without scheme is appended
    pub metamask_deep_link: String,
    /// Phantom extension install page
    pub phantom_install_url: String,
    /// Phantom mobile browse deep link prefix
    pub phantom_deep_link: String,
    /// Solana mainnet-beta RPC
    pub solana_mainnet_url: String,
    /// Solana testnet RPC
    pub solana_testnet_url: String,
    /// Block explorer used in confirmation logs
    pub explorer_url: String,
    /// Confirmation polling
    pub confirmation: ConfirmationConfig,
}

impl Default for WalletsConfig {
    fn default() -> Self {
        Self {
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            domain_lookup_url: DEFAULT_DOMAIN_LOOKUP_URL.to_string(),
            sns_proxy_url: web3_wallets_provider::sns::DEFAULT_SNS_PROXY.to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            metamask_install_url:
                "https://chrome.google.com/webstore/detail/metamask/nkbihfbeogaeaoehlefnkodbefgpgknn"
                    .to_string(),
            metamask_deep_link: "https://metamask.app.link/dapp/".to_string(),
            phantom_install_url:
                "https://chrome.google.com/webstore/detail/phantom/bfnaelmomeimhlpmgjnjophhpkkoljpa"
                    .to_string(),
            phantom_deep_link: "https://phantom.app/ul/browse/".to_string(),
            solana_mainnet_url: "https://api.mainnet-beta.solana.com".to_string(),
            solana_testnet_url: "https://api.testnet.solana.com".to_string(),
            explorer_url: "https://solscan.io".to_string(),
            confirmation: ConfirmationConfig::default(),
        }
    }
}

impl WalletsConfig {
    /// Creates a configuration with the default endpoints
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Sets the WalletConnect bridge
    pub fn with_bridge_url(mut self, url: impl Into<String>) -> Self {
        self.bridge_url = url.into();
        self
    }

    /// Sets the domain reverse-lookup base URL
    pub fn with_domain_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.domain_lookup_url = url.into();
        self
    }

    /// Sets the SNS proxy base URL
    pub fn with_sns_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.sns_proxy_url = url.into();
        self
    }

    /// Sets the storage key
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Sets the RPC endpoint of a Solana cluster
    pub fn with_solana_url(mut self, cluster: SolanaCluster, url: impl Into<String>) -> Self {
        match cluster {
            SolanaCluster::MainnetBeta => self.solana_mainnet_url = url.into(),
            SolanaCluster::Testnet => self.solana_testnet_url = url.into(),
        }
        self
    }

    /// Sets the explorer base URL
    pub fn with_explorer_url(mut self, url: impl Into<String>) -> Self {
        self.explorer_url = url.into();
        self
    }

    /// Sets confirmation polling
    pub fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// RPC endpoint of `cluster`
    pub fn solana_url(&self, cluster: SolanaCluster) -> &str {
        match cluster {
            SolanaCluster::MainnetBeta => &self.solana_mainnet_url,
            SolanaCluster::Testnet => &self.solana_testnet_url,
        }
    }

    /// Explorer link for a transaction signature
    pub fn explorer_tx_url(&self, signature: &str, cluster: SolanaCluster) -> String {
        let base = self.explorer_url.trim_end_matches('/');
        match cluster {
            SolanaCluster::MainnetBeta => format!("{base}/tx/{signature}"),
            SolanaCluster::Testnet => format!("{base}/tx/{signature}?cluster=testnet"),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let urls = [
            ("bridge_url", &self.bridge_url),
            ("domain_lookup_url", &self.domain_lookup_url),
            ("sns_proxy_url", &self.sns_proxy_url),
            ("metamask_install_url", &self.metamask_install_url),
            ("metamask_deep_link", &self.metamask_deep_link),
            ("phantom_install_url", &self.phantom_install_url),
            ("phantom_deep_link", &self.phantom_deep_link),
            ("solana_mainnet_url", &self.solana_mainnet_url),
            ("solana_testnet_url", &self.solana_testnet_url),
            ("explorer_url", &self.explorer_url),
        ];
        for (field, url) in urls {
            Url::parse(url).map_err(|e| WalletsError::ConfigError(format!("{field}: {e}")))?;
        }
        if self.storage_key.is_empty() {
            return Err(WalletsError::ConfigError("storage_key must not be empty".into()));
        }
        if self.confirmation.max_attempts == 0 {
            return Err(WalletsError::ConfigError(
                "confirmation.max_attempts must be > 0".into(),
            ));
        }
        Ok(())
    }
}
