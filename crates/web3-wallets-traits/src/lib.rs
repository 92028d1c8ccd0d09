//! # web3-wallets traits
//!
//! Shared types and capability traits for the web3-wallets connection adapter.
//!
//! The adapter never talks to a browser or a wallet SDK directly. Everything
//! it needs from the outside world is expressed here as a trait object the
//! host supplies:
//!
//! - [`EvmProvider`] - an injected EIP-1193 provider (MetaMask)
//! - [`RelayConnector`] / [`RelayClient`] - a WalletConnect v1 bridge client
//! - [`SolanaProvider`] - an injected Solana wallet (Phantom)
//! - [`NameService`] - forward/reverse domain resolution (ENS, .sol)
//! - [`NetworkRegistry`] - chain id to RPC URL and chain-switch params
//! - [`KeyValueStore`] - durable storage for the last wallet choice
//! - [`Navigator`] / [`Notifier`] - browser location and user-visible warnings
//!
//! ## Example
//!
//! ```
//! use web3_wallets_traits::prelude::*;
//!
//! let chain = ChainId::from_hex("0x89").unwrap();
//! assert_eq!(chain, ChainId::new(137));
//! assert_eq!(chain.family(), Some(ChainFamily::Evm));
//! assert_eq!("Phantom".parse::<WalletName>().unwrap(), WalletName::Phantom);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chain;
pub mod network;
pub mod services;
pub mod transport;

pub use chain::{ChainFamily, ChainId, SolanaCluster, TxHash, WalletName};
pub use network::{AddEthereumChainParameter, NativeCurrency, NetworkInfo, NetworkRegistry};
pub use services::{KeyValueStore, NameService, Navigator, Notifier};
pub use transport::{
    DisconnectReason, EvmEvent, EvmEventKind, EvmListener, EvmProvider, ListenerId,
    ProviderRpcError, RelayClient, RelayConnector, RelayEvent, RelayPayload, RelaySession,
    SolanaProvider, SolanaTransaction, TransactionSigner,
};

pub use web3_wallets_error::{Result, WalletsError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AddEthereumChainParameter, ChainFamily, ChainId, DisconnectReason, EvmEvent,
        EvmEventKind, EvmListener, EvmProvider, KeyValueStore, ListenerId, NameService,
        NativeCurrency, Navigator, NetworkInfo, NetworkRegistry, Notifier, ProviderRpcError,
        RelayClient, RelayConnector, RelayEvent, RelayPayload, RelaySession, Result,
        SolanaCluster, SolanaProvider, SolanaTransaction, TransactionSigner, TxHash,
        WalletName, WalletsError,
    };
}
