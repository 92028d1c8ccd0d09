//! Chain identifiers, wallet names and transaction hashes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use web3_wallets_error::WalletsError;

/// Signed chain identifier.
///
/// Positive values are EVM chain ids. Negative values identify non-EVM
/// ledgers: `-1`/`-1001` are Solana mainnet/testnet and `-3`/`-1003` are
/// TON mainnet/testnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub i64);

/// Ledger family a [`ChainId`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainFamily {
    /// Ethereum-compatible chains
    Evm,
    /// Solana clusters
    Solana,
    /// The Open Network
    Ton,
}

impl ChainId {
    /// Ethereum mainnet
    pub const ETHEREUM: ChainId = ChainId(1);
    /// Solana mainnet-beta
    pub const SOLANA_MAINNET: ChainId = ChainId(-1);
    /// Solana testnet
    pub const SOLANA_TESTNET: ChainId = ChainId(-1001);
    /// TON mainnet
    pub const TON_MAINNET: ChainId = ChainId(-3);
    /// TON testnet
    pub const TON_TESTNET: ChainId = ChainId(-1003);

    /// Wraps a raw chain id
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw chain id
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns true for positive (EVM) chain ids
    pub const fn is_evm(self) -> bool {
        self.0 > 0
    }

    /// Returns the ledger family, or `None` for ids no wallet here understands
    pub fn family(self) -> Option<ChainFamily> {
        match self {
            c if c.is_evm() => Some(ChainFamily::Evm),
            ChainId::SOLANA_MAINNET | ChainId::SOLANA_TESTNET => Some(ChainFamily::Solana),
            ChainId::TON_MAINNET | ChainId::TON_TESTNET => Some(ChainFamily::Ton),
            _ => None,
        }
    }

    /// Parses a chain id as reported by a wallet.
    ///
    /// Accepts `0x`-prefixed hex (`"0x89"`) as injected EVM providers report it,
    /// and plain decimal (`"137"`, `"-1"`).
    pub fn from_hex(value: &str) -> Result<Self, WalletsError> {
        let trimmed = value.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => i64::from_str_radix(hex, 16),
            None => trimmed.parse::<i64>(),
        };
        parsed
            .map(ChainId)
            .map_err(|e| WalletsError::InvalidChainId(format!("{value}: {e}")))
    }

    /// Hex form used by `wallet_switchEthereumChain`; `None` for non-EVM ids
    pub fn to_hex(self) -> Option<String> {
        self.is_evm().then(|| format!("0x{:x}", self.0))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChainId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Solana cluster selected implicitly by the session chain id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolanaCluster {
    /// `mainnet-beta`, chain id -1
    MainnetBeta,
    /// `testnet`, chain id -1001
    Testnet,
}

impl SolanaCluster {
    /// Maps a chain id to its cluster; anything but -1/-1001 is an error
    pub fn from_chain_id(chain_id: ChainId) -> Result<Self, WalletsError> {
        match chain_id {
            ChainId::SOLANA_MAINNET => Ok(SolanaCluster::MainnetBeta),
            ChainId::SOLANA_TESTNET => Ok(SolanaCluster::Testnet),
            other => Err(WalletsError::UnknownCluster(other.value())),
        }
    }

    /// Cluster name as used by Solana tooling
    pub fn as_str(&self) -> &'static str {
        match self {
            SolanaCluster::MainnetBeta => "mainnet-beta",
            SolanaCluster::Testnet => "testnet",
        }
    }
}

impl fmt::Display for SolanaCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The wallets this adapter can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletName {
    /// MetaMask browser extension (injected EVM provider)
    MetaMask,
    /// WalletConnect v1 QR pairing over a bridge relay
    WalletConnect,
    /// Phantom browser extension (injected Solana provider)
    Phantom,
}

impl WalletName {
    /// Every supported wallet
    pub const ALL: [WalletName; 3] = [
        WalletName::MetaMask,
        WalletName::WalletConnect,
        WalletName::Phantom,
    ];

    /// Name as persisted and shown to users
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletName::MetaMask => "MetaMask",
            WalletName::WalletConnect => "WalletConnect",
            WalletName::Phantom => "Phantom",
        }
    }
}

impl fmt::Display for WalletName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletName {
    type Err = WalletsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WalletName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| WalletsError::UnknownWallet(s.to_string()))
    }
}

/// Represents a transaction hash/signature as returned by a wallet
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl TxHash {
    /// Creates a new TxHash from a string
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Returns the hash as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TxHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TxHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
