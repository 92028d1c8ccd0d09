//! # web3-wallets error
//!
//! Unified error type for the web3-wallets connection adapter. Every crate in
//! the workspace converts its local failures into [`WalletsError`] at its
//! public boundary.
//!
//! ## Error Categories
//!
//! - vendor errors reported by an injected wallet or relay ([`WalletsError::Provider`])
//! - configuration errors (unknown network, missing chain-switch params, unsupported chain)
//! - transport errors (RPC, HTTP, timeouts)
//! - session errors (no active wallet, unsupported operation)
//!
//! ## Example
//!
//! ```
//! use web3_wallets_error::{WalletsError, Result, USER_REJECTED};
//!
//! fn check(code: i64) -> Result<()> {
//!     if code == USER_REJECTED {
//!         return Err(WalletsError::Provider {
//!             code,
//!             message: "User rejected the request.".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(4001).unwrap_err().is_user_rejection());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use thiserror::Error;

/// EIP-1193 code returned when the user declines a wallet prompt.
pub const USER_REJECTED: i64 = 4001;

/// EIP-1193 code returned when the requested account or method is unauthorized.
pub const UNAUTHORIZED: i64 = 4100;

/// MetaMask code returned by `wallet_switchEthereumChain` for a chain it does not know.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// The main error type for web3-wallets operations.
#[derive(Error, Debug)]
pub enum WalletsError {
    // ============ Wallet Errors ============
    /// Wallet name is not one of the supported wallets
    #[error("Unknown wallet name: {0}")]
    UnknownWallet(String),

    /// The wallet extension is not present in this environment
    #[error("Wallet provider not available: {0}")]
    ProviderUnavailable(String),

    /// Error reported by the wallet itself
    #[error("Wallet provider error {code}: {message}")]
    Provider {
        /// Vendor error code (EIP-1193 style)
        code: i64,
        /// Vendor message
        message: String,
    },

    /// No wallet is connected
    #[error("No wallet connected")]
    NotConnected,

    // ============ Network/Chain Errors ============
    /// Chain id is not in the network registry
    #[error("Unknown network for chain id {0}")]
    UnknownNetwork(i64),

    /// Network registry entry has no chain-switch parameters
    #[error("Missing network params for chain id {0}")]
    MissingNetworkParams(i64),

    /// Operation is not implemented for this chain id
    #[error("Not implemented or wrong chainId {0}")]
    UnsupportedChain(i64),

    /// Chain id does not map to a Solana cluster
    #[error("Unknown chain id {0} -> cluster")]
    UnknownCluster(i64),

    /// Chain id string could not be parsed
    #[error("Invalid chain id: {0}")]
    InvalidChainId(String),

    // ============ Address Errors ============
    /// Invalid address format or checksum
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The invalid address
        address: String,
        /// Reason for invalidity
        reason: String,
    },

    // ============ Transaction Errors ============
    /// Transaction signing failed
    #[error("Failed to sign transaction: {0}")]
    SigningError(String),

    /// Transaction broadcast failed
    #[error("Failed to broadcast transaction: {0}")]
    BroadcastError(String),

    // ============ Transport Errors ============
    /// RPC connection failed
    #[error("RPC connection failed: {url} - {reason}")]
    RpcConnectionError {
        /// RPC URL
        url: String,
        /// Error reason
        reason: String,
    },

    /// RPC request failed
    #[error("RPC request failed: {method} - {reason}")]
    RpcRequestError {
        /// RPC method name
        method: String,
        /// Error reason
        reason: String,
    },

    /// Network timeout
    #[error("Network timeout after {seconds}s")]
    NetworkTimeout {
        /// Timeout duration
        seconds: u64,
    },

    /// Rate limited by the remote service
    #[error("Rate limited by provider")]
    RateLimited,

    // ============ Feature/Support Errors ============
    /// Operation is not supported by the active wallet
    #[error("Not supported: {0}")]
    NotSupported(String),

    // ============ Storage/Config Errors ============
    /// Durable storage failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ============ Parsing Errors ============
    /// JSON parse error
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Invalid format
    #[error("Invalid format: {0}")]
    FormatError(String),

    /// File IO error
    #[error("IO error: {0}")]
    IoError(String),

    // ============ Generic ============
    /// Unknown/other error
    #[error("{0}")]
    Other(String),

    /// Wrapped error from external source
    #[error("External error: {message}")]
    External {
        /// Error message
        message: String,
    },
}

/// Convenient Result type using WalletsError
pub type Result<T> = std::result::Result<T, WalletsError>;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Adds context to an error
    fn context(self, ctx: impl Into<String>) -> Result<T>;

    /// Adds context using a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| WalletsError::External {
            message: format!("{}: {}", ctx.into(), e),
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| WalletsError::External {
            message: format!("{}: {}", f(), e),
        })
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| WalletsError::Other(ctx.into()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| WalletsError::Other(f()))
    }
}

// ============ From implementations for common error types ============

impl From<std::io::Error> for WalletsError {
    fn from(err: std::io::Error) -> Self {
        WalletsError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for WalletsError {
    fn from(err: serde_json::Error) -> Self {
        WalletsError::JsonError(err.to_string())
    }
}

impl From<url::ParseError> for WalletsError {
    fn from(err: url::ParseError) -> Self {
        WalletsError::ConfigError(format!("invalid URL: {err}"))
    }
}

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// Unknown error
    Unknown = 0,
    /// Unknown wallet name
    UnknownWallet = 1001,
    /// Wallet extension missing
    ProviderUnavailable = 1002,
    /// User declined the wallet prompt
    UserRejected = 1003,
    /// Other vendor error
    ProviderError = 1004,
    /// No wallet connected
    NotConnected = 1005,
    /// Unknown network
    UnknownNetwork = 2001,
    /// Missing chain-switch params
    MissingNetworkParams = 2002,
    /// Unsupported chain
    UnsupportedChain = 2003,
    /// Invalid address
    InvalidAddress = 3001,
    /// Signing error
    SigningError = 4001,
    /// Broadcast error
    BroadcastError = 4002,
    /// RPC connection error
    RpcConnectionError = 5001,
    /// RPC request error
    RpcRequestError = 5002,
    /// Network timeout
    NetworkTimeout = 5003,
    /// Rate limited
    RateLimited = 5004,
    /// Storage error
    StorageError = 6001,
    /// Configuration error
    ConfigError = 6002,
    /// Not supported
    NotSupported = 9001,
}

impl WalletsError {
    /// Returns the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            WalletsError::UnknownWallet(_) => ErrorCode::UnknownWallet,
            WalletsError::ProviderUnavailable(_) => ErrorCode::ProviderUnavailable,
            WalletsError::Provider { code, .. } if *code == USER_REJECTED => ErrorCode::UserRejected,
            WalletsError::Provider { .. } => ErrorCode::ProviderError,
            WalletsError::NotConnected => ErrorCode::NotConnected,
            WalletsError::UnknownNetwork(_) => ErrorCode::UnknownNetwork,
            WalletsError::MissingNetworkParams(_) => ErrorCode::MissingNetworkParams,
            WalletsError::UnsupportedChain(_) | WalletsError::UnknownCluster(_) => {
                ErrorCode::UnsupportedChain
            }
            WalletsError::InvalidAddress { .. } => ErrorCode::InvalidAddress,
            WalletsError::SigningError(_) => ErrorCode::SigningError,
            WalletsError::BroadcastError(_) => ErrorCode::BroadcastError,
            WalletsError::RpcConnectionError { .. } => ErrorCode::RpcConnectionError,
            WalletsError::RpcRequestError { .. } => ErrorCode::RpcRequestError,
            WalletsError::NetworkTimeout { .. } => ErrorCode::NetworkTimeout,
            WalletsError::RateLimited => ErrorCode::RateLimited,
            WalletsError::StorageError(_) => ErrorCode::StorageError,
            WalletsError::ConfigError(_) => ErrorCode::ConfigError,
            WalletsError::NotSupported(_) => ErrorCode::NotSupported,
            _ => ErrorCode::Unknown,
        }
    }

    /// Returns true if the wallet reported that the user declined the request
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, WalletsError::Provider { code, .. } if *code == USER_REJECTED)
    }

    /// Returns the vendor error code, if this error came from a wallet
    pub fn provider_code(&self) -> Option<i64> {
        match self {
            WalletsError::Provider { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletsError::NetworkTimeout { .. }
                | WalletsError::RateLimited
                | WalletsError::RpcConnectionError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WalletsError::InvalidAddress {
            address: "0x123".to_string(),
            reason: "Too short".to_string(),
        };
        assert!(err.to_string().contains("0x123"));
        assert!(err.to_string().contains("Too short"));
    }

    #[test]
    fn test_unsupported_chain_message() {
        let err = WalletsError::UnsupportedChain(-7);
        assert_eq!(err.to_string(), "Not implemented or wrong chainId -7");
    }

    #[test]
    fn test_user_rejection() {
        let rejected = WalletsError::Provider {
            code: USER_REJECTED,
            message: "User rejected the request.".into(),
        };
        assert!(rejected.is_user_rejection());
        assert_eq!(rejected.code(), ErrorCode::UserRejected);
        assert_eq!(rejected.provider_code(), Some(4001));

        let unknown_chain = WalletsError::Provider {
            code: UNRECOGNIZED_CHAIN,
            message: "Unrecognized chain ID".into(),
        };
        assert!(!unknown_chain.is_user_rejection());
        assert_eq!(unknown_chain.code(), ErrorCode::ProviderError);
    }

    #[test]
    fn test_error_code() {
        assert_eq!(WalletsError::MissingNetworkParams(1).code(), ErrorCode::MissingNetworkParams);
        assert_eq!(WalletsError::UnknownCluster(5).code(), ErrorCode::UnsupportedChain);
        assert_eq!(WalletsError::NotConnected.code(), ErrorCode::NotConnected);
        assert_eq!(WalletsError::Other("x".into()).code(), ErrorCode::Unknown);
    }

    #[test]
    fn test_retryable() {
        assert!(WalletsError::NetworkTimeout { seconds: 30 }.is_retryable());
        assert!(WalletsError::RateLimited.is_retryable());
        assert!(!WalletsError::NotConnected.is_retryable());
    }

    #[test]
    fn test_error_context() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "file missing"));

        let with_ctx = result.context("Failed to load wallet choice");
        assert!(with_ctx
            .unwrap_err()
            .to_string()
            .contains("Failed to load wallet choice"));
    }

    #[test]
    fn test_option_context() {
        let missing: Option<u8> = None;
        let err = missing.context("no accounts returned").unwrap_err();
        assert_eq!(err.to_string(), "no accounts returned");
    }

    #[test]
    fn test_from_json_error() {
        let err: WalletsError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert!(err.to_string().starts_with("JSON error"));
    }
}
