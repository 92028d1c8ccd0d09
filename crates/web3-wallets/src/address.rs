//! Address validation, formatting and domain resolution.
//!
//! Synchronous checks cover the raw address formats of each chain family;
//! names (`.eth`, `.sol`) go through the [`NameResolvers`].

use std::sync::Arc;
use tiny_keccak::{Hasher, Keccak};
use web3_wallets_error::{Result, WalletsError};
use web3_wallets_traits::{ChainFamily, ChainId, NameService};

/// Placeholder mint used for native SOL
pub const SOLANA_NATIVE_TOKEN: &str = "So11111111111111111111111111111111111111111";

/// Placeholder token address used for the native EVM currency
pub const EVM_NATIVE_TOKEN: &str = "0x0000000000000000000000000000000000000000";

const TON_PREFIXES: [&str; 4] = ["EQ", "kQ", "Ef", "UQ"];

/// Name services used for `.eth` and `.sol` names
#[derive(Clone)]
pub struct NameResolvers {
    /// ENS, resolved against Ethereum mainnet
    pub ens: Arc<dyn NameService>,
    /// Solana name service
    pub sns: Arc<dyn NameService>,
}

impl NameResolvers {
    /// Bundles the two services
    pub fn new(ens: Arc<dyn NameService>, sns: Arc<dyn NameService>) -> Self {
        Self { ens, sns }
    }
}

impl std::fmt::Debug for NameResolvers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameResolvers").finish_non_exhaustive()
    }
}

/// Shortens an address for display.
///
/// Domain names (anything whose fourth character from the end is `.`) are
/// returned unchanged. Otherwise the result is the first six characters for
/// `0x` addresses, or four for anything else, then `...`, then the last four.
///
/// ```
/// use web3_wallets::address::shorten_address;
///
/// assert_eq!(shorten_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"), "0x5aAe...eAed");
/// assert_eq!(shorten_address("vitalik.eth"), "vitalik.eth");
/// ```
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() >= 4 && chars[chars.len() - 4] == '.' {
        return address.to_string();
    }
    let prefix_len = if address.starts_with("0x") { 6 } else { 4 };
    let prefix: String = chars.iter().take(prefix_len).collect();
    let suffix: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{prefix}...{suffix}")
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}

/// EIP-55 mixed-case form of a 0x-prefixed 20-byte hex address
pub fn to_checksum_address(address: &str) -> Result<String> {
    let hex_part = address
        .strip_prefix("0x")
        .filter(|h| h.len() == 40 && h.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| WalletsError::InvalidAddress {
            address: address.to_string(),
            reason: "expected 0x followed by 40 hex characters".into(),
        })?;

    let lower = hex_part.to_ascii_lowercase();
    let hash = keccak256(lower.as_bytes());
    let checksummed: String = lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();
    Ok(format!("0x{checksummed}"))
}

/// `0x` + 40 hex characters; mixed-case input must carry a valid EIP-55 checksum
pub fn is_valid_evm_address(address: &str) -> bool {
    let Ok(checksummed) = to_checksum_address(address) else {
        return false;
    };
    let hex_part = &address[2..];
    let all_lower = !hex_part.chars().any(|c| c.is_ascii_uppercase());
    let all_upper = !hex_part.chars().any(|c| c.is_ascii_lowercase());
    all_lower || all_upper || checksummed == address
}

/// Base58 string decoding to a 32-byte public key
pub fn is_valid_solana_address(address: &str) -> bool {
    bs58::decode(address)
        .into_vec()
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}

/// User-friendly TON address: 48 url-safe base64 characters with a known tag prefix
pub fn is_valid_ton_address(address: &str) -> bool {
    address.len() == 48
        && TON_PREFIXES.iter().any(|p| address.starts_with(p))
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validates `address` for `chain_id`.
///
/// `.eth` names are valid when ENS resolves them; resolver errors propagate.
/// `.sol` names are valid when SNS resolves them; any failure reads as invalid.
/// Chain ids outside the EVM, Solana and TON families are an error.
pub async fn is_valid_address(
    resolvers: &NameResolvers,
    chain_id: ChainId,
    address: &str,
) -> Result<bool> {
    match chain_id.family() {
        Some(ChainFamily::Evm) => {
            if address.ends_with(".eth") {
                let resolved = resolvers.ens.resolve(address).await?;
                return Ok(resolved.is_some_and(|a| !a.is_empty()));
            }
            Ok(is_valid_evm_address(address))
        }
        Some(ChainFamily::Solana) => {
            if address.ends_with(".sol") {
                return match resolvers.sns.resolve(address).await {
                    Ok(resolved) => Ok(resolved.is_some()),
                    Err(e) => {
                        tracing::debug!(address, error = %e, "sns resolution failed");
                        Ok(false)
                    }
                };
            }
            Ok(is_valid_solana_address(address))
        }
        Some(ChainFamily::Ton) => Ok(is_valid_ton_address(address)),
        None => Err(WalletsError::UnsupportedChain(chain_id.value())),
    }
}

/// Address representing the chain's native currency in token lists
pub fn native_token_address(chain_id: ChainId) -> Option<&'static str> {
    match chain_id.family() {
        Some(ChainFamily::Solana) => Some(SOLANA_NATIVE_TOKEN),
        Some(ChainFamily::Evm) => Some(EVM_NATIVE_TOKEN),
        _ => None,
    }
}

/// Resolves `.sol` and `.eth` names; any other input is returned as is.
///
/// `Ok(None)` means the name exists syntactically but does not resolve.
pub async fn parse_address_from_domain(
    resolvers: &NameResolvers,
    input: &str,
) -> Result<Option<String>> {
    if input.ends_with(".sol") {
        resolvers.sns.resolve(input).await
    } else if input.ends_with(".eth") {
        resolvers.ens.resolve(input).await
    } else {
        Ok(Some(input.to_string()))
    }
}

/// Best-effort reverse lookup; failures are logged and read as "no domain"
pub(crate) async fn lookup_domain(names: &dyn NameService, address: &str) -> Option<String> {
    match names.reverse_lookup(address).await {
        Ok(domain) => domain.filter(|d| !d.is_empty()),
        Err(e) => {
            tracing::warn!(address, error = %e, "can't get domain");
            None
        }
    }
}
