//! # web3-wallets provider
//!
//! HTTP and JSON-RPC plumbing for the web3-wallets connection adapter.
//!
//! ## Features
//!
//! - [`RpcClient`]: pooled `reqwest` client with optional rate limiting
//! - [`DomainLookupClient`]: reverse lookup of EVM addresses to display domains, cached
//! - [`EnsClient`]: ENS forward resolution over `eth_call`
//! - [`SnsClient`]: Solana name service (.sol) resolution through an HTTP proxy
//! - [`SolanaRpc`]: blockhash, raw submission and confirmation polling
//! - [`StaticNetworkRegistry`]: built-in chain table with EIP-3085 params
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use web3_wallets_provider::{RpcClient, SolanaRpc};
//!
//! let client = Arc::new(RpcClient::new()?);
//! let rpc = SolanaRpc::new(client, "https://api.testnet.solana.com");
//! let blockhash = rpc.latest_blockhash().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod domains;
pub mod ens;
pub mod registry;
pub mod sns;
pub mod solana;

pub use domains::DomainLookupClient;
pub use ens::{namehash, EnsClient};
pub use registry::StaticNetworkRegistry;
pub use sns::SnsClient;
pub use solana::{Commitment, ConfirmationPolicy, ConfirmationStatus, SignatureStatus, SolanaRpc};

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use web3_wallets_error::WalletsError;

/// Provider-related errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Client could not be built or the connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RPC error response
    #[error("RPC error in {method}: code={code}, message={message}")]
    RpcError {
        /// Method that failed
        method: String,
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Response did not have the expected shape
    #[error("Unexpected response from {method}: {reason}")]
    UnexpectedResponse {
        /// Method or endpoint
        method: String,
        /// What was wrong
        reason: String,
    },
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

impl From<ProviderError> for WalletsError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidUrl(e) | ProviderError::InvalidConfig(e) => {
                WalletsError::ConfigError(e)
            }
            ProviderError::ConnectionFailed(reason) => WalletsError::RpcConnectionError {
                url: String::new(),
                reason,
            },
            ProviderError::Http(e) => {
                let url = e.url().map(|u| u.to_string()).unwrap_or_default();
                if e.is_timeout() {
                    WalletsError::NetworkTimeout { seconds: 0 }
                } else if e.status().map(|s| s.as_u16()) == Some(429) {
                    WalletsError::RateLimited
                } else {
                    WalletsError::RpcConnectionError {
                        url,
                        reason: e.to_string(),
                    }
                }
            }
            ProviderError::Json(e) => WalletsError::JsonError(e.to_string()),
            ProviderError::RpcError {
                method,
                code,
                message,
            } => WalletsError::RpcRequestError {
                method,
                reason: format!("code={code}, message={message}"),
            },
            ProviderError::UnexpectedResponse { method, reason } => {
                WalletsError::RpcRequestError { method, reason }
            }
        }
    }
}

// ============================================================================
// HTTP Client with Connection Pooling
// ============================================================================

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
    /// Idle connection timeout
    pub pool_idle_timeout_secs: u64,
    /// Connection timeout
    pub connect_timeout_secs: u64,
    /// Request timeout
    pub request_timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Enable gzip compression
    pub gzip: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 4,
            pool_idle_timeout_secs: 90,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: format!("web3-wallets/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
        }
    }
}

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Burst size (max requests in a burst)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 20,
        }
    }
}

/// RPC request payload
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<T: Serialize> {
    /// JSON-RPC version
    pub jsonrpc: &'static str,
    /// Method name
    pub method: String,
    /// Parameters
    pub params: T,
    /// Request ID
    pub id: u64,
}

impl<T: Serialize> JsonRpcRequest<T> {
    /// Creates a new JSON-RPC request
    pub fn new(method: impl Into<String>, params: T, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
            id,
        }
    }
}

/// RPC response payload
#[derive(Debug, Clone, serde::Deserialize)]
pub struct JsonRpcResponse<T> {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Response ID
    pub id: u64,
    /// Result (if successful)
    pub result: Option<T>,
    /// Error (if failed)
    pub error: Option<JsonRpcError>,
}

/// RPC error
#[derive(Debug, Clone, serde::Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
    /// Additional data
    pub data: Option<serde_json::Value>,
}

/// HTTP client with connection pooling and rate limiting
pub struct RpcClient {
    client: Client,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Creates a new RPC client with default configuration and no rate limit
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default(), None)
    }

    /// Creates a new RPC client with custom configuration
    pub fn with_config(
        http_config: HttpClientConfig,
        rate_limit: Option<RateLimitConfig>,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(http_config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(http_config.pool_idle_timeout_secs))
            .connect_timeout(Duration::from_secs(http_config.connect_timeout_secs))
            .timeout(Duration::from_secs(http_config.request_timeout_secs))
            .user_agent(&http_config.user_agent)
            .gzip(http_config.gzip)
            .build()
            .map_err(|e: reqwest::Error| ProviderError::ConnectionFailed(e.to_string()))?;

        let rate_limiter = rate_limit
            .map(|config| -> Result<_> {
                let per_second = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
                    ProviderError::InvalidConfig("requests_per_second must be > 0".into())
                })?;
                let burst = NonZeroU32::new(config.burst_size).ok_or_else(|| {
                    ProviderError::InvalidConfig("burst_size must be > 0".into())
                })?;
                Ok(RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst)))
            })
            .transpose()?;

        Ok(Self {
            client,
            rate_limiter,
            request_id: AtomicU64::new(1),
        })
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }

    /// Makes a JSON-RPC request
    pub async fn rpc_call<P, R>(&self, url: &str, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.throttle().await;

        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(method, params, id);

        tracing::debug!(method, id, "json-rpc request");
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let rpc_response: JsonRpcResponse<R> = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(ProviderError::RpcError {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| ProviderError::UnexpectedResponse {
                method: method.to_string(),
                reason: "no result in response".to_string(),
            })
    }

    /// Makes a GET request and decodes the JSON body
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.throttle().await;

        let response = self.client.get(url).send().await?.error_for_status()?;
        let result: T = response.json().await?;
        Ok(result)
    }

    /// Makes a GET request with query parameters and decodes the JSON body
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.throttle().await;

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        let result: T = response.json().await?;
        Ok(result)
    }

    /// Returns the number of JSON-RPC requests made
    pub fn request_count(&self) -> u64 {
        self.request_id.load(Ordering::SeqCst) - 1
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("request_count", &self.request_count())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_http_client_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.user_agent.starts_with("web3-wallets/"));
        assert!(config.gzip);
    }

    #[test]
    fn test_rpc_client_creation() {
        let client = RpcClient::new().unwrap();
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let result = RpcClient::with_config(
            HttpClientConfig::default(),
            Some(RateLimitConfig {
                requests_per_second: 0,
                burst_size: 1,
            }),
        );
        assert!(matches!(result, Err(ProviderError::InvalidConfig(_))));
    }

    #[test]
    fn test_json_rpc_request() {
        let request = JsonRpcRequest::new("eth_call", Vec::<()>::new(), 1);
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("eth_call"));
        assert!(json.contains("\"id\":1"));
    }

    #[tokio::test]
    async fn test_rpc_call_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"method": "eth_chainId"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x1"
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new().unwrap();
        let chain: String = client
            .rpc_call(&server.uri(), "eth_chainId", Vec::<()>::new())
            .await
            .unwrap();
        assert_eq!(chain, "0x1");
        assert_eq!(client.request_count(), 1);
    }

    #[tokio::test]
    async fn test_rpc_call_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32601, "message": "Method not found"}
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new().unwrap();
        let err = client
            .rpc_call::<_, String>(&server.uri(), "eth_nope", Vec::<()>::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RpcError { code: -32601, .. }));

        let converted: WalletsError = err.into();
        assert!(matches!(converted, WalletsError::RpcRequestError { ref method, .. } if method == "eth_nope"));
    }

    #[tokio::test]
    async fn test_get_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = RpcClient::new().unwrap();
        let result = client
            .get::<serde_json::Value>(&format!("{}/missing", server.uri()))
            .await;
        assert!(matches!(result, Err(ProviderError::Http(_))));
    }
}
