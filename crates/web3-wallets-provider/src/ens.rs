//! ENS forward resolution over `eth_call`.

use crate::{DomainLookupClient, ProviderError, RpcClient};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tiny_keccak::{Hasher, Keccak};
use web3_wallets_traits::NameService;

/// ENS registry, same address on mainnet and testnets
pub const ENS_REGISTRY: &str = "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e";

/// `resolver(bytes32)`
const RESOLVER_SELECTOR: &str = "0178b8bf";

/// `addr(bytes32)`
const ADDR_SELECTOR: &str = "3b3b57de";

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}

/// EIP-137 namehash of a dotted name
pub fn namehash(name: &str) -> [u8; 32] {
    let mut node = [0u8; 32];
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&node);
        buf[32..].copy_from_slice(&label_hash);
        node = keccak256(&buf);
    }
    node
}

/// Extracts the address from a 32-byte ABI word; `None` for the zero address
fn decode_address_word(method: &str, word: &str) -> crate::Result<Option<String>> {
    let hex_str = word.trim_start_matches("0x");
    if hex_str.is_empty() {
        return Ok(None);
    }
    let bytes = hex::decode(hex_str).map_err(|e| ProviderError::UnexpectedResponse {
        method: method.to_string(),
        reason: format!("invalid hex: {e}"),
    })?;
    if bytes.len() < 32 {
        return Err(ProviderError::UnexpectedResponse {
            method: method.to_string(),
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        });
    }
    let addr = &bytes[12..32];
    if addr.iter().all(|b| *b == 0) {
        return Ok(None);
    }
    Ok(Some(format!("0x{}", hex::encode(addr))))
}

/// ENS name service backed by an Ethereum mainnet RPC endpoint
pub struct EnsClient {
    client: Arc<RpcClient>,
    rpc_url: String,
    registry: String,
    domains: Option<Arc<DomainLookupClient>>,
}

impl EnsClient {
    /// Creates a client resolving against `rpc_url`
    pub fn new(client: Arc<RpcClient>, rpc_url: impl Into<String>) -> Self {
        Self {
            client,
            rpc_url: rpc_url.into(),
            registry: ENS_REGISTRY.to_string(),
            domains: None,
        }
    }

    /// Uses `domains` for reverse lookups
    pub fn with_reverse_lookup(mut self, domains: Arc<DomainLookupClient>) -> Self {
        self.domains = Some(domains);
        self
    }

    /// Overrides the registry address
    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    async fn call_for_address(&self, to: &str, selector: &str, node: &[u8; 32]) -> crate::Result<Option<String>> {
        let data = format!("0x{}{}", selector, hex::encode(node));
        let word: String = self
            .client
            .rpc_call(&self.rpc_url, "eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        decode_address_word("eth_call", &word)
    }

    /// Resolves `name` to its `addr` record
    pub async fn resolve_name(&self, name: &str) -> crate::Result<Option<String>> {
        let node = namehash(&name.to_lowercase());
        let Some(resolver) = self.call_for_address(&self.registry, RESOLVER_SELECTOR, &node).await? else {
            tracing::debug!(name, "ens name has no resolver");
            return Ok(None);
        };
        self.call_for_address(&resolver, ADDR_SELECTOR, &node).await
    }
}

#[async_trait]
impl NameService for EnsClient {
    async fn resolve(&self, name: &str) -> web3_wallets_traits::Result<Option<String>> {
        Ok(self.resolve_name(name).await?)
    }

    async fn reverse_lookup(&self, address: &str) -> web3_wallets_traits::Result<Option<String>> {
        match &self.domains {
            Some(domains) => Ok(domains.reverse_lookup(address).await),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for EnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsClient")
            .field("rpc_url", &self.rpc_url)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESOLVER: &str = "0x4976fb03c32e5b8cfe2b6ccb31c09ba78ebaba41";
    const TARGET: &str = "0xd8da6bf26964af9d7eed9e03e53415d37aa96045";

    fn word(addr: &str) -> String {
        format!("0x{:0>64}", addr.trim_start_matches("0x"))
    }

    #[test]
    fn test_namehash_vectors() {
        assert_eq!(namehash(""), [0u8; 32]);
        assert_eq!(
            hex::encode(namehash("eth")),
            "93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
        );
        assert_eq!(
            hex::encode(namehash("foo.eth")),
            "de9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
        );
    }

    #[test]
    fn test_decode_address_word() {
        assert_eq!(decode_address_word("m", &word(TARGET)).unwrap().as_deref(), Some(TARGET));
        assert_eq!(decode_address_word("m", &word("0")).unwrap(), None);
        assert_eq!(decode_address_word("m", "0x").unwrap(), None);
        assert!(decode_address_word("m", "0x1234").is_err());
    }

    #[tokio::test]
    async fn test_resolve_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"params": [{"to": ENS_REGISTRY}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": word(RESOLVER)
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"params": [{"to": RESOLVER}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 2, "result": word(TARGET)
            })))
            .mount(&server)
            .await;

        let ens = EnsClient::new(Arc::new(RpcClient::new().unwrap()), server.uri());
        assert_eq!(ens.resolve("vitalik.eth").await.unwrap().as_deref(), Some(TARGET));
    }

    #[tokio::test]
    async fn test_resolve_without_resolver() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": word("0")
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ens = EnsClient::new(Arc::new(RpcClient::new().unwrap()), server.uri());
        assert_eq!(ens.resolve("nobody-owns-this.eth").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reverse_lookup_delegates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse-lookup"))
            .and(query_param("address", TARGET))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"domain": "vitalik.eth"})))
            .mount(&server)
            .await;

        let client = Arc::new(RpcClient::new().unwrap());
        let domains = Arc::new(DomainLookupClient::new(client.clone(), server.uri()));
        let ens = EnsClient::new(client.clone(), server.uri()).with_reverse_lookup(domains);
        assert_eq!(ens.reverse_lookup(TARGET).await.unwrap().as_deref(), Some("vitalik.eth"));

        let bare = EnsClient::new(client, server.uri());
        assert_eq!(bare.reverse_lookup(TARGET).await.unwrap(), None);
    }
}
