//! Reverse lookup of EVM addresses to display domains.

use crate::RpcClient;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default time a lookup result stays cached
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct ReverseLookupResponse {
    #[serde(default)]
    domain: Option<String>,
}

/// Client for `GET {base}/reverse-lookup?address=...`
///
/// Lookups are best-effort: any transport or decode failure is logged and
/// reported as "no domain". Results, including misses, are cached per
/// lowercase address.
pub struct DomainLookupClient {
    client: Arc<RpcClient>,
    base_url: String,
    ttl: Duration,
    cache: DashMap<String, (Option<String>, Instant)>,
}

impl DomainLookupClient {
    /// Creates a client for `base_url` with the default cache TTL
    pub fn new(client: Arc<RpcClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl: DEFAULT_CACHE_TTL,
            cache: DashMap::new(),
        }
    }

    /// Sets the cache TTL; zero disables caching
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Base URL of the lookup service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the domain registered for `address`, or `None`
    pub async fn reverse_lookup(&self, address: &str) -> Option<String> {
        let key = address.to_lowercase();
        if let Some(entry) = self.cache.get(&key) {
            let (domain, at) = entry.value();
            if at.elapsed() < self.ttl {
                return domain.clone();
            }
        }

        let url = format!("{}/reverse-lookup", self.base_url);
        let domain = match self
            .client
            .get_with_query::<ReverseLookupResponse>(&url, &[("address", address)])
            .await
        {
            Ok(resp) => resp.domain.filter(|d| !d.is_empty()),
            Err(e) => {
                tracing::warn!(address, error = %e, "domain reverse lookup failed");
                return None;
            }
        };

        if !self.ttl.is_zero() {
            self.cache.insert(key, (domain.clone(), Instant::now()));
        }
        domain
    }

    /// Drops every cached result
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for DomainLookupClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainLookupClient")
            .field("base_url", &self.base_url)
            .field("ttl", &self.ttl)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADDR: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    fn client(server: &MockServer) -> DomainLookupClient {
        DomainLookupClient::new(Arc::new(RpcClient::new().unwrap()), server.uri())
    }

    #[tokio::test]
    async fn test_reverse_lookup_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse-lookup"))
            .and(query_param("address", ADDR))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"domain": "vitalik.eth"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let lookup = client(&server);
        assert_eq!(lookup.reverse_lookup(ADDR).await.as_deref(), Some("vitalik.eth"));
        // second call is served from cache; `expect(1)` is verified on drop
        assert_eq!(lookup.reverse_lookup(ADDR).await.as_deref(), Some("vitalik.eth"));
    }

    #[tokio::test]
    async fn test_reverse_lookup_empty_domain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse-lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"domain": ""})))
            .mount(&server)
            .await;

        assert_eq!(client(&server).reverse_lookup(ADDR).await, None);
    }

    #[tokio::test]
    async fn test_reverse_lookup_failure_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse-lookup"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let lookup = client(&server);
        assert_eq!(lookup.reverse_lookup(ADDR).await, None);
        // failures are not cached
        assert_eq!(lookup.reverse_lookup(ADDR).await, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse-lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let lookup = client(&server).with_ttl(Duration::ZERO);
        assert_eq!(lookup.reverse_lookup(ADDR).await, None);
        assert_eq!(lookup.reverse_lookup(ADDR).await, None);
    }
}
