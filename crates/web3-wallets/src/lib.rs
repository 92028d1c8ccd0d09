//! # web3-wallets
//!
//! Wallet connection adapter for dapps: one session, three wallets.
//!
//! | Wallet | Transport | Chains |
//! |--------|-----------|--------|
//! | MetaMask | injected EIP-1193 provider | EVM |
//! | WalletConnect | v1 bridge relay | EVM |
//! | Phantom | injected Solana provider | Solana mainnet / testnet |
//!
//! The [`WalletController`] drives the adapters and publishes a [`Session`]
//! on a watch channel; [`WalletContext`] is the mounted form a UI holds.
//! Vendor SDKs and browser services are supplied by the host through the
//! traits in [`web3_wallets_traits`].
//!
//! ## Chain ids
//!
//! Positive ids are EVM chains. Negative ids name non-EVM networks:
//! -1 / -1001 are Solana mainnet / testnet, -3 / -1003 are TON mainnet / testnet.
//!
//! ## Example
//!
//! ```ignore
//! use web3_wallets::prelude::*;
//!
//! let controller = WalletController::builder(WalletsConfig::default())
//!     .metamask(injected_ethereum)
//!     .store(Arc::new(JsonFileStore::new("wallet.json")))
//!     .build()?;
//! let ctx = WalletContext::mount(controller).await;
//!
//! if ctx.connect(WalletName::MetaMask, Some(ChainId::new(137))).await? {
//!     println!("connected {:?}", ctx.state().address_short);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapters;
pub mod address;
pub mod browser;
pub mod config;
pub mod context;
pub mod controller;
pub mod session;
pub mod signer;
pub mod storage;

pub use adapters::{ConfirmationEvent, ConnectOptions, Transaction, WalletAdapter, WalletEvent};
pub use address::{
    is_valid_address, native_token_address, parse_address_from_domain, shorten_address,
    to_checksum_address, NameResolvers,
};
pub use config::{ConfirmationConfig, WalletsConfig};
pub use context::WalletContext;
pub use controller::{WalletController, WalletControllerBuilder};
pub use session::{ActiveProvider, Connection, Session};
pub use signer::Keypair;
pub use storage::{JsonFileStore, MemoryStore};

pub use web3_wallets_error::{ErrorCode, Result, WalletsError};
pub use web3_wallets_traits::{ChainFamily, ChainId, SolanaCluster, TxHash, WalletName};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a std mutex; the guarded data stays usable after a panic elsewhere
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ActiveProvider, ChainFamily, ChainId, ConfirmationEvent, JsonFileStore, Keypair,
        MemoryStore, Result, Session, SolanaCluster, Transaction, TxHash, WalletContext,
        WalletController, WalletName, WalletsConfig, WalletsError,
    };
}
