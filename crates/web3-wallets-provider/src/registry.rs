//! Built-in network table.

use std::collections::HashMap;
use web3_wallets_traits::{
    AddEthereumChainParameter, ChainId, NativeCurrency, NetworkInfo, NetworkRegistry,
};

fn evm(
    id: i64,
    name: &str,
    rpc_url: &str,
    currency: (&str, &str),
    explorer: &str,
) -> NetworkInfo {
    let chain_id = ChainId::new(id);
    NetworkInfo {
        chain_id,
        name: name.to_string(),
        rpc_url: rpc_url.to_string(),
        params: Some(vec![AddEthereumChainParameter {
            chain_id: format!("0x{id:x}"),
            chain_name: name.to_string(),
            native_currency: NativeCurrency {
                name: currency.0.to_string(),
                symbol: currency.1.to_string(),
                decimals: 18,
            },
            rpc_urls: vec![rpc_url.to_string()],
            block_explorer_urls: vec![explorer.to_string()],
        }]),
    }
}

fn non_evm(chain_id: ChainId, name: &str, rpc_url: &str) -> NetworkInfo {
    NetworkInfo {
        chain_id,
        name: name.to_string(),
        rpc_url: rpc_url.to_string(),
        params: None,
    }
}

/// In-memory [`NetworkRegistry`].
///
/// [`StaticNetworkRegistry::new`] ships the EVM chains the adapter is usually
/// deployed against, plus Solana and TON entries without switch params.
#[derive(Debug, Clone)]
pub struct StaticNetworkRegistry {
    networks: HashMap<ChainId, NetworkInfo>,
}

impl StaticNetworkRegistry {
    /// Registry with the default table
    pub fn new() -> Self {
        let defaults = [
            evm(1, "Ethereum Mainnet", "https://eth.llamarpc.com", ("Ether", "ETH"), "https://etherscan.io"),
            evm(56, "BNB Smart Chain", "https://bsc-dataseed.binance.org", ("BNB", "BNB"), "https://bscscan.com"),
            evm(137, "Polygon Mainnet", "https://polygon-rpc.com", ("MATIC", "MATIC"), "https://polygonscan.com"),
            evm(43114, "Avalanche C-Chain", "https://api.avax.network/ext/bc/C/rpc", ("Avalanche", "AVAX"), "https://snowtrace.io"),
            evm(42161, "Arbitrum One", "https://arb1.arbitrum.io/rpc", ("Ether", "ETH"), "https://arbiscan.io"),
            evm(10, "OP Mainnet", "https://mainnet.optimism.io", ("Ether", "ETH"), "https://optimistic.etherscan.io"),
            evm(250, "Fantom Opera", "https://rpc.ftm.tools", ("Fantom", "FTM"), "https://ftmscan.com"),
            evm(100, "Gnosis", "https://rpc.gnosischain.com", ("xDAI", "xDAI"), "https://gnosisscan.io"),
            evm(8453, "Base", "https://mainnet.base.org", ("Ether", "ETH"), "https://basescan.org"),
            evm(11155111, "Sepolia", "https://rpc.sepolia.org", ("Sepolia Ether", "ETH"), "https://sepolia.etherscan.io"),
            non_evm(ChainId::SOLANA_MAINNET, "Solana", "https://api.mainnet-beta.solana.com"),
            non_evm(ChainId::SOLANA_TESTNET, "Solana Testnet", "https://api.testnet.solana.com"),
            non_evm(ChainId::TON_MAINNET, "TON", "https://toncenter.com/api/v2/jsonRPC"),
            non_evm(ChainId::TON_TESTNET, "TON Testnet", "https://testnet.toncenter.com/api/v2/jsonRPC"),
        ];
        Self {
            networks: defaults.into_iter().map(|n| (n.chain_id, n)).collect(),
        }
    }

    /// Registry with no entries
    pub fn empty() -> Self {
        Self {
            networks: HashMap::new(),
        }
    }

    /// Adds or replaces an entry
    pub fn with_network(mut self, info: NetworkInfo) -> Self {
        self.insert(info);
        self
    }

    /// Adds or replaces an entry
    pub fn insert(&mut self, info: NetworkInfo) {
        self.networks.insert(info.chain_id, info);
    }

    /// Known chain ids
    pub fn chain_ids(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.networks.keys().copied()
    }
}

impl Default for StaticNetworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkRegistry for StaticNetworkRegistry {
    fn network(&self, chain_id: ChainId) -> Option<NetworkInfo> {
        self.networks.get(&chain_id).cloned()
    }
}
