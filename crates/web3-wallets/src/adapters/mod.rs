//! Per-wallet protocol handling.
//!
//! Each adapter wraps one vendor transport and reduces its handshake to a
//! [`Connection`]. Adapters never touch session state: wallet-originated
//! changes are sent to the controller as [`WalletEvent`]s.

mod metamask;
mod phantom;
mod walletconnect;

pub use metamask::MetaMaskAdapter;
pub use phantom::{ConfirmationEvent, PhantomAdapter};
pub use walletconnect::{WalletConnectAdapter, WRONG_NETWORK_WARNING};

use crate::session::Connection;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use web3_wallets_error::Result;
use web3_wallets_traits::{
    ChainId, DisconnectReason, SolanaTransaction, TransactionSigner, TxHash, WalletName,
};

/// Wallet-originated change, applied by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// MetaMask switched chain
    ChainChanged(ChainId),
    /// MetaMask accounts changed; empty means the wallet disconnected the dapp
    AccountsChanged(Vec<String>),
    /// WalletConnect `session_update`
    RelaySessionUpdate {
        /// Wallet accounts
        accounts: Vec<String>,
        /// Wallet chain
        chain_id: ChainId,
    },
    /// WalletConnect session ended or was rejected
    RelayDisconnected(DisconnectReason),
}

pub(crate) type EventSender = mpsc::UnboundedSender<WalletEvent>;

/// Options for [`WalletAdapter::connect`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Chain the dapp wants; `None` accepts whatever the wallet is on
    pub chain_id: Option<ChainId>,
    /// WalletConnect: start pairing and show the QR code; otherwise only
    /// inspect an existing session
    pub show_qr: bool,
    /// Phantom: connect silently if the dapp is already trusted
    pub is_reconnect: bool,
}

impl ConnectOptions {
    /// Interactive connect to `chain_id`
    pub fn interactive(chain_id: Option<ChainId>) -> Self {
        Self {
            chain_id,
            show_qr: true,
            is_reconnect: false,
        }
    }

    /// Passive check that never prompts the user
    pub fn passive(chain_id: Option<ChainId>) -> Self {
        Self {
            chain_id,
            show_qr: false,
            is_reconnect: true,
        }
    }
}

/// A transaction in the format of the wallet that will send it
pub enum Transaction {
    /// EIP-1193 transaction object, forwarded verbatim
    Evm(Value),
    /// Solana transaction plus extra co-signers
    Solana {
        /// Transaction built by the host
        tx: Box<dyn SolanaTransaction>,
        /// Keypairs that sign before the wallet does
        signers: Vec<Arc<dyn TransactionSigner>>,
    },
}

impl Transaction {
    /// Solana transaction without co-signers
    pub fn solana(tx: impl SolanaTransaction + 'static) -> Self {
        Transaction::Solana {
            tx: Box::new(tx),
            signers: Vec::new(),
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transaction::Evm(tx) => f.debug_tuple("Evm").field(tx).finish(),
            Transaction::Solana { tx, signers } => f
                .debug_struct("Solana")
                .field("tx", tx)
                .field("signers", &signers.len())
                .finish(),
        }
    }
}

/// Common surface of the three wallet adapters
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Wallet this adapter drives
    fn name(&self) -> WalletName;

    /// True when the wallet's transport is present
    fn is_available(&self) -> bool;

    /// Performs the handshake; `Ok(None)` means "not connected" (rejected,
    /// absent, or nothing to reconnect)
    async fn connect(&self, options: ConnectOptions) -> Result<Option<Connection>>;

    /// Tears down listeners, sessions and background tasks
    async fn disconnect(&self) -> Result<()>;

    /// Sends `tx` on `chain_id`; `Ok(None)` when the wallet swallowed a failure
    async fn send_transaction(&self, chain_id: Option<ChainId>, tx: Transaction) -> Result<Option<TxHash>>;

    /// Moves the wallet to `chain_id`; false when it stayed where it was
    async fn change_network(&self, chain_id: ChainId) -> Result<bool>;
}

pub(crate) fn emit(events: &EventSender, event: WalletEvent) {
    if let Err(e) = events.send(event) {
        tracing::debug!(event = ?e.0, "controller gone, wallet event dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connect_options() {
        let chain = Some(ChainId::new(56));
        assert!(ConnectOptions::interactive(chain).show_qr);
        assert!(!ConnectOptions::interactive(chain).is_reconnect);
        assert!(!ConnectOptions::passive(None).show_qr);
        assert!(ConnectOptions::passive(None).is_reconnect);
    }

    #[test]
    fn test_emit_without_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        emit(&tx, WalletEvent::ChainChanged(ChainId::ETHEREUM));
    }

    #[test]
    fn test_transaction_debug() {
        let tx = Transaction::Evm(json!({"to": "0xabc"}));
        assert!(format!("{tx:?}").contains("0xabc"));
    }
}
