//! Connection state published to the UI.

use crate::address::shorten_address;
use std::fmt;
use std::sync::Arc;
use web3_wallets_traits::{ChainId, EvmProvider, SolanaProvider, WalletName};

/// Handle of the active transport; its variant always matches the session's wallet
#[derive(Clone)]
pub enum ActiveProvider {
    /// Injected EIP-1193 provider
    MetaMask(Arc<dyn EvmProvider>),
    /// JSON-RPC endpoint for reads while paired over WalletConnect
    WalletConnect {
        /// RPC URL of the wallet's chain
        rpc_url: String,
    },
    /// Injected Solana provider
    Phantom(Arc<dyn SolanaProvider>),
}

impl ActiveProvider {
    /// Wallet this provider belongs to
    pub fn wallet_name(&self) -> WalletName {
        match self {
            ActiveProvider::MetaMask(_) => WalletName::MetaMask,
            ActiveProvider::WalletConnect { .. } => WalletName::WalletConnect,
            ActiveProvider::Phantom(_) => WalletName::Phantom,
        }
    }
}

impl fmt::Debug for ActiveProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveProvider::MetaMask(_) => f.write_str("MetaMask(<injected>)"),
            ActiveProvider::WalletConnect { rpc_url } => f
                .debug_struct("WalletConnect")
                .field("rpc_url", rpc_url)
                .finish(),
            ActiveProvider::Phantom(_) => f.write_str("Phantom(<injected>)"),
        }
    }
}

/// Result of a successful adapter handshake
#[derive(Debug, Clone)]
pub struct Connection {
    /// Active account
    pub address: String,
    /// Chain the wallet ended up on
    pub chain_id: ChainId,
    /// Display domain of the account, if any
    pub domain: Option<String>,
    /// Transport handle
    pub provider: ActiveProvider,
}

/// Snapshot of the wallet session
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Connected wallet
    pub wallet_name: Option<WalletName>,
    /// Chain the wallet is on
    pub chain_id: Option<ChainId>,
    /// Raw account address
    pub address: Option<String>,
    /// [`shorten_address`] of `address`
    pub address_short: Option<String>,
    /// ENS / .sol name of `address`
    pub address_domain: Option<String>,
    /// Active transport
    pub provider: Option<ActiveProvider>,
    /// A connect or restore is in flight
    pub is_loading: bool,
}

impl Session {
    /// True when both a wallet and an address are set
    pub fn is_connected(&self) -> bool {
        self.wallet_name.is_some() && self.address.is_some()
    }

    /// True when nothing but possibly `is_loading` is set
    pub fn is_empty(&self) -> bool {
        self.wallet_name.is_none()
            && self.chain_id.is_none()
            && self.address.is_none()
            && self.address_short.is_none()
            && self.address_domain.is_none()
            && self.provider.is_none()
    }

    pub(crate) fn apply_connection(&mut self, connection: Connection) {
        self.wallet_name = Some(connection.provider.wallet_name());
        self.chain_id = Some(connection.chain_id);
        self.address_short = Some(shorten_address(&connection.address));
        self.address = Some(connection.address);
        self.address_domain = connection.domain;
        self.provider = Some(connection.provider);
    }

    pub(crate) fn set_account(&mut self, address: String, domain: Option<String>) {
        self.address_short = Some(shorten_address(&address));
        self.address = Some(address);
        self.address_domain = domain;
    }

    pub(crate) fn reset(&mut self) {
        *self = Session {
            is_loading: self.is_loading,
            ..Session::default()
        };
    }
}
