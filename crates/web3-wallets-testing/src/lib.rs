//! # web3-wallets testing infrastructure
//!
//! Test utilities for the web3-wallets adapter:
//! - in-memory mocks of every vendor transport ([`MockEvmProvider`],
//!   [`MockRelayConnector`], [`MockSolanaProvider`])
//! - recording implementations of the host services
//! - edge case addresses and property-based testing strategies
//!
//! ## Usage
//!
//! ```rust,ignore
//! use web3_wallets_testing::*;
//!
//! let metamask = Arc::new(MockEvmProvider::new().with_accounts(vec![EdgeCaseAddresses::ETH_VALID.into()]));
//! metamask.push_response("eth_requestAccounts", Err(ProviderRpcError::user_rejected()));
//!
//! proptest! {
//!     #[test]
//!     fn test_ton_addresses(addr in ton_address()) {
//!         // ...
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod evm;
mod relay;
mod services;
mod solana;

pub use evm::MockEvmProvider;
pub use relay::{MockRelayClient, MockRelayConnector, PairingOutcome};
pub use services::{FailingStore, RecordingNavigator, RecordingNotifier, StaticNameService};
pub use solana::{MockSigner, MockSolanaProvider, MockSolanaTransaction, TxState};

use proptest::prelude::*;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a panicking test poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Edge Case Addresses
// ============================================================================

/// Edge case addresses for testing
pub struct EdgeCaseAddresses;

impl EdgeCaseAddresses {
    /// EIP-55 checksummed Ethereum address
    pub const ETH_VALID: &'static str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    /// Second EIP-55 vector
    pub const ETH_VALID_2: &'static str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

    /// Same as [`Self::ETH_VALID`] with the last letter's case flipped
    pub const ETH_BAD_CHECKSUM: &'static str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD";

    /// Ethereum zero address
    pub const ETH_ZERO: &'static str = "0x0000000000000000000000000000000000000000";

    /// All-lowercase address (no checksum to verify)
    pub const ETH_LOWER: &'static str = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045";

    /// Solana system program
    pub const SOL_SYSTEM: &'static str = "11111111111111111111111111111111";

    /// USDC mint on Solana
    pub const SOL_USDC_MINT: &'static str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    /// User-friendly bounceable TON address
    pub const TON_VALID: &'static str = "EQD4FPq-PRDieyQKkizFTRtSDyucUIqrj0v_zXJmqaDp6_0t";

    /// Invalid Ethereum addresses
    pub fn invalid_ethereum() -> Vec<&'static str> {
        vec![
            "",
            "0x",
            "0xGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGGG", // Invalid hex
            "0x742d35Cc6634C0532925a3b844Bc9e7595f5",     // Too short
            "5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",   // Missing 0x
            Self::ETH_BAD_CHECKSUM,
        ]
    }

    /// Invalid Solana addresses
    pub fn invalid_solana() -> Vec<&'static str> {
        vec![
            "",
            "0OIl",                                          // Not base58
            "1111111111111111111111111111111",               // 31 bytes
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v1", // Too long
        ]
    }

    /// Invalid TON addresses
    pub fn invalid_ton() -> Vec<&'static str> {
        vec![
            "",
            "EQD4FPq-PRDieyQKkizFTRtSDyucUIqrj0v_zXJmqaDp6_0",   // 47 chars
            "XXD4FPq-PRDieyQKkizFTRtSDyucUIqrj0v_zXJmqaDp6_0t",  // Bad prefix
            "EQD4FPq+PRDieyQKkizFTRtSDyucUIqrj0v_zXJmqaDp6_0t",  // '+' not url-safe
            "EQD4FPq-PRDieyQKkizFTRtSDyucUIqrj0v_zXJmqaDp6_0t0", // 49 chars
        ]
    }
}

// ============================================================================
// Property-Based Testing Strategies
// ============================================================================

/// Lowercase 0x-prefixed 20-byte hex addresses
pub fn evm_address() -> impl Strategy<Value = String> {
    prop::array::uniform20(any::<u8>()).prop_map(|bytes| format!("0x{}", hex::encode(bytes)))
}

/// Base58 encodings of 32-byte public keys
pub fn solana_address() -> impl Strategy<Value = String> {
    prop::array::uniform32(any::<u8>()).prop_map(|bytes| bs58::encode(bytes).into_string())
}

/// Well-formed user-friendly TON addresses
pub fn ton_address() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["EQ", "kQ", "Ef", "UQ"]),
        "[a-zA-Z0-9_-]{46}",
    )
        .prop_map(|(prefix, body)| format!("{prefix}{body}"))
}

/// `.eth` and `.sol` names
pub fn domain_name() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9]{2,15}", prop::sample::select(vec!["eth", "sol"]))
        .prop_map(|(label, tld)| format!("{label}.{tld}"))
}

/// Positive (EVM) chain ids
pub fn evm_chain_id() -> impl Strategy<Value = i64> {
    1i64..=i64::from(u32::MAX)
}

/// Chain ids that belong to no supported family
pub fn unsupported_chain_id() -> impl Strategy<Value = i64> {
    (i64::MIN..=0i64).prop_filter("known non-EVM chain", |id| {
        !matches!(*id, -1 | -1001 | -3 | -1003)
    })
}

/// Chain ids that are not Solana clusters
pub fn non_solana_chain_id() -> impl Strategy<Value = i64> {
    any::<i64>().prop_filter("solana cluster", |id| !matches!(*id, -1 | -1001))
}

// ============================================================================
// Tests
// ============================================================================
