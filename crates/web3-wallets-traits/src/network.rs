//! Network registry types.
//!
//! The registry maps a [`ChainId`] to the RPC endpoint used for read calls and
//! to the EIP-3085 parameters MetaMask needs to switch to (or add) the chain.

use crate::chain::ChainId;
use serde::{Deserialize, Serialize};

/// Native currency block of an EIP-3085 `wallet_addEthereumChain` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name, e.g. "Ether"
    pub name: String,
    /// Ticker, e.g. "ETH"
    pub symbol: String,
    /// Decimals, 18 for every EVM chain in the default table
    pub decimals: u8,
}

/// EIP-3085 chain parameters, serialized exactly as the wallet expects them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEthereumChainParameter {
    /// Hex chain id, e.g. "0x89"
    pub chain_id: String,
    /// Human readable chain name
    pub chain_name: String,
    /// Native currency
    pub native_currency: NativeCurrency,
    /// RPC endpoints
    pub rpc_urls: Vec<String>,
    /// Block explorers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_explorer_urls: Vec<String>,
}

/// One registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Chain id this entry describes
    pub chain_id: ChainId,
    /// Display name
    pub name: String,
    /// RPC endpoint for read calls
    pub rpc_url: String,
    /// Chain-switch parameters; absent for networks MetaMask cannot switch to
    pub params: Option<Vec<AddEthereumChainParameter>>,
}

/// Lookup of network metadata by chain id
pub trait NetworkRegistry: Send + Sync {
    /// Returns the entry for `chain_id`, if known
    fn network(&self, chain_id: ChainId) -> Option<NetworkInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_serialize_camel_case() {
        let params = AddEthereumChainParameter {
            chain_id: "0x89".into(),
            chain_name: "Polygon Mainnet".into(),
            native_currency: NativeCurrency {
                name: "MATIC".into(),
                symbol: "MATIC".into(),
                decimals: 18,
            },
            rpc_urls: vec!["https://polygon-rpc.com".into()],
            block_explorer_urls: vec![],
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["chainId"], "0x89");
        assert_eq!(json["chainName"], "Polygon Mainnet");
        assert_eq!(json["nativeCurrency"]["decimals"], 18);
        assert!(json.get("blockExplorerUrls").is_none());
    }
}
