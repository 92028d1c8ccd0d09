//! Solana name service (.sol) through an HTTP resolution proxy.

use crate::RpcClient;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use web3_wallets_traits::NameService;

/// Default SNS proxy
pub const DEFAULT_SNS_PROXY: &str = "https://sns-sdk-proxy.bonfida.workers.dev";

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    s: String,
    #[serde(default)]
    result: Value,
}

/// `.sol` resolver
///
/// - `GET {base}/resolve/{name}` -> `{"s":"ok","result":"<pubkey>"}`
/// - `GET {base}/favorite-domain/{owner}` -> `{"s":"ok","result":{"reverse":"<name>"}}`
///
/// An `"s":"error"` reply means the name or owner has no record.
pub struct SnsClient {
    client: Arc<RpcClient>,
    base_url: String,
}

impl SnsClient {
    /// Creates a client for the proxy at `base_url`
    pub fn new(client: Arc<RpcClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolves `name` (with or without the `.sol` suffix) to its owner key
    pub async fn resolve_name(&self, name: &str) -> crate::Result<Option<String>> {
        let label = name.strip_suffix(".sol").unwrap_or(name);
        let url = format!("{}/resolve/{}", self.base_url, label);
        let resp: ProxyResponse = self.client.get(&url).await?;
        if resp.s != "ok" {
            return Ok(None);
        }
        Ok(resp
            .result
            .as_str()
            .filter(|r| !r.is_empty())
            .map(str::to_string))
    }

    /// Returns the owner's favorite domain with the `.sol` suffix
    pub async fn favorite_domain(&self, owner: &str) -> crate::Result<Option<String>> {
        let url = format!("{}/favorite-domain/{}", self.base_url, owner);
        let resp: ProxyResponse = self.client.get(&url).await?;
        if resp.s != "ok" {
            return Ok(None);
        }
        Ok(resp
            .result
            .get("reverse")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .map(|r| format!("{r}.sol")))
    }
}

#[async_trait]
impl NameService for SnsClient {
    async fn resolve(&self, name: &str) -> web3_wallets_traits::Result<Option<String>> {
        Ok(self.resolve_name(name).await?)
    }

    async fn reverse_lookup(&self, address: &str) -> web3_wallets_traits::Result<Option<String>> {
        Ok(self.favorite_domain(address).await?)
    }
}

impl std::fmt::Debug for SnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnsClient").field("base_url", &self.base_url).finish()
    }
}
