//! Vendor transports.
//!
//! Each wallet SDK is reduced to the handful of calls the adapter makes. A
//! browser host implements these over `window.ethereum`, the WalletConnect
//! client and `window.solana`; tests implement them with in-memory mocks.

use crate::chain::ChainId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use web3_wallets_error::{Result, WalletsError, UNRECOGNIZED_CHAIN, USER_REJECTED};

/// Error object returned by an injected provider or relay (EIP-1193 shape)
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("provider error {code}: {message}")]
pub struct ProviderRpcError {
    /// Numeric error code
    pub code: i64,
    /// Message as reported by the wallet
    pub message: String,
    /// Optional vendor data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    /// The user declined the prompt
    pub const USER_REJECTED: i64 = USER_REJECTED;
    /// The wallet does not know the requested chain
    pub const UNRECOGNIZED_CHAIN: i64 = UNRECOGNIZED_CHAIN;

    /// Creates an error without vendor data
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Shorthand for a 4001 rejection
    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED, "User rejected the request.")
    }

    /// True for code 4001
    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED
    }

    /// True for code 4902
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == UNRECOGNIZED_CHAIN
    }
}

impl From<ProviderRpcError> for WalletsError {
    fn from(err: ProviderRpcError) -> Self {
        WalletsError::Provider {
            code: err.code,
            message: err.message,
        }
    }
}

// ============================================================================
// Injected EVM provider (EIP-1193)
// ============================================================================

/// Events an injected EVM provider emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvmEvent {
    /// `chainChanged` with the new hex chain id
    ChainChanged(String),
    /// `accountsChanged`; an empty list means the wallet disconnected
    AccountsChanged(Vec<String>),
}

impl EvmEvent {
    /// Kind of this event
    pub fn kind(&self) -> EvmEventKind {
        match self {
            EvmEvent::ChainChanged(_) => EvmEventKind::ChainChanged,
            EvmEvent::AccountsChanged(_) => EvmEventKind::AccountsChanged,
        }
    }
}

/// Event names listeners can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvmEventKind {
    /// `chainChanged`
    ChainChanged,
    /// `accountsChanged`
    AccountsChanged,
}

impl EvmEventKind {
    /// EIP-1193 event name
    pub fn as_str(&self) -> &'static str {
        match self {
            EvmEventKind::ChainChanged => "chainChanged",
            EvmEventKind::AccountsChanged => "accountsChanged",
        }
    }
}

/// Handle returned by [`EvmProvider::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Callback registered on an EVM provider
pub type EvmListener = Arc<dyn Fn(EvmEvent) + Send + Sync>;

/// An injected EIP-1193 provider
#[async_trait]
pub trait EvmProvider: Send + Sync {
    /// True when the provider identifies itself as MetaMask
    fn is_metamask(&self) -> bool;

    /// Current chain id in hex, as the provider caches it
    fn chain_id(&self) -> Option<String>;

    /// Sends a JSON-RPC request through the wallet
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, ProviderRpcError>;

    /// Registers a listener
    fn on(&self, kind: EvmEventKind, listener: EvmListener) -> ListenerId;

    /// Removes a listener registered with [`EvmProvider::on`]
    fn remove_listener(&self, kind: EvmEventKind, id: ListenerId);

    /// MetaMask's `_metamask.isUnlocked()`; false when the extension does not expose it
    async fn is_unlocked(&self) -> bool {
        false
    }
}

// ============================================================================
// WalletConnect v1 relay
// ============================================================================

/// Accounts and chain reported in `connect` / `session_update` payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPayload {
    /// Wallet accounts, first one is active
    pub accounts: Vec<String>,
    /// Chain the wallet is on
    pub chain_id: i64,
}

/// Events emitted by a relay client
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Wallet approved the session after scanning the QR code
    Connect(RelayPayload),
    /// Wallet changed account or chain
    SessionUpdate(RelayPayload),
    /// Session ended; message distinguishes who ended it
    Disconnect {
        /// Vendor message, e.g. "Session Rejected"
        message: Option<String>,
    },
    /// Incoming session request
    SessionRequest(Value),
    /// Incoming call request
    CallRequest(Value),
}

/// Why a relay session ended, parsed from the vendor message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// "Session Rejected": the user declined after scanning
    Rejected,
    /// "Session disconnected": ended from the wallet
    ByWallet,
    /// "Session Disconnected": ended from the dapp
    ByDapp,
    /// Anything else
    Other(Option<String>),
}

impl DisconnectReason {
    /// Classifies a vendor message; the match is case sensitive
    pub fn from_message(message: Option<&str>) -> Self {
        match message {
            Some("Session Rejected") => DisconnectReason::Rejected,
            Some("Session disconnected") => DisconnectReason::ByWallet,
            Some("Session Disconnected") => DisconnectReason::ByDapp,
            other => DisconnectReason::Other(other.map(str::to_string)),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Rejected => f.write_str("session rejected"),
            DisconnectReason::ByWallet => f.write_str("disconnected by wallet"),
            DisconnectReason::ByDapp => f.write_str("disconnected by dapp"),
            DisconnectReason::Other(Some(m)) => write!(f, "disconnected: {m}"),
            DisconnectReason::Other(None) => f.write_str("disconnected"),
        }
    }
}

/// Session a relay client restored or established
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySession {
    /// Wallet accounts
    pub accounts: Vec<String>,
    /// Wallet chain
    pub chain_id: i64,
    /// Peer wallet name, if reported
    pub peer_name: Option<String>,
}

/// A WalletConnect v1 client bound to one bridge
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// True when a session (possibly restored from storage) is live
    fn is_connected(&self) -> bool;

    /// The live session, if any
    fn session(&self) -> Option<RelaySession>;

    /// Starts pairing; the QR modal is shown by the client
    async fn create_session(&self) -> std::result::Result<(), ProviderRpcError>;

    /// Ends the live session
    async fn kill_session(&self) -> std::result::Result<(), ProviderRpcError>;

    /// Asks the paired wallet to send an EVM transaction; returns its hash
    async fn send_transaction(&self, tx: Value) -> std::result::Result<Value, ProviderRpcError>;

    /// Subscribes to relay events
    fn subscribe(&self) -> broadcast::Receiver<RelayEvent>;
}

/// Factory creating a relay client for a bridge URL
pub trait RelayConnector: Send + Sync {
    /// Creates a client; it restores any session the SDK persisted itself
    fn connect(&self, bridge_url: &str) -> Arc<dyn RelayClient>;
}

// ============================================================================
// Injected Solana provider
// ============================================================================

/// Extra keypair co-signing a Solana transaction before the wallet signs
pub trait TransactionSigner: Send + Sync + fmt::Debug {
    /// Base58 public key
    fn public_key(&self) -> String;

    /// Ed25519 signature over `message`
    fn sign_message(&self, message: &[u8]) -> Vec<u8>;
}

/// A Solana transaction as built by the host's SDK
pub trait SolanaTransaction: Send + Sync + fmt::Debug {
    /// Fee payer public key
    fn fee_payer(&self) -> Option<String>;

    /// Sets the fee payer
    fn set_fee_payer(&mut self, fee_payer: String);

    /// Recent blockhash
    fn recent_blockhash(&self) -> Option<String>;

    /// Sets the recent blockhash
    fn set_recent_blockhash(&mut self, blockhash: String);

    /// Adds signatures from `signers`, leaving the wallet's slot empty
    fn partial_sign(&mut self, signers: &[Arc<dyn TransactionSigner>]) -> Result<()>;

    /// Wire encoding of the (signed) transaction
    fn serialize(&self) -> Result<Vec<u8>>;
}

/// An injected Solana wallet
#[async_trait]
pub trait SolanaProvider: Send + Sync {
    /// True when the provider identifies itself as Phantom
    fn is_phantom(&self) -> bool;

    /// Connected public key
    fn public_key(&self) -> Option<String>;

    /// Connects and returns the base58 public key.
    ///
    /// With `only_if_trusted` the wallet connects silently or fails; it never prompts.
    async fn connect(&self, only_if_trusted: bool) -> std::result::Result<String, ProviderRpcError>;

    /// Asks the wallet to sign
    async fn sign_transaction(
        &self,
        tx: Box<dyn SolanaTransaction>,
    ) -> std::result::Result<Box<dyn SolanaTransaction>, ProviderRpcError>;

    /// Disconnects the dapp from the wallet
    async fn disconnect(&self) -> std::result::Result<(), ProviderRpcError>;
}

/// Convenience for adapters that only care whether a chain is the one requested
pub fn same_chain(reported: i64, requested: Option<ChainId>) -> bool {
    requested.map_or(true, |c| c.value() == reported)
}
