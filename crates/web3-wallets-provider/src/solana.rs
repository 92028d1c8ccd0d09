//! Solana JSON-RPC: blockhash, raw submission and confirmation polling.

use crate::{ProviderError, RpcClient};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Solana commitment levels, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Processed by the connected node
    Processed,
    /// Voted on by a supermajority
    Confirmed,
    /// Rooted
    Finalized,
}

impl Commitment {
    /// RPC name of the commitment level
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

/// How long and how often to poll for a signature's status
#[derive(Debug, Clone)]
pub struct ConfirmationPolicy {
    /// Delay before the second poll
    pub initial_interval: Duration,
    /// Upper bound on the delay between polls
    pub max_interval: Duration,
    /// Interval growth per poll
    pub multiplier: f64,
    /// Polls before giving up
    pub max_attempts: u32,
    /// Commitment the signature must reach
    pub commitment: Commitment,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            multiplier: 1.5,
            max_attempts: 60,
            commitment: Commitment::Finalized,
        }
    }
}

impl ConfirmationPolicy {
    /// Create a new policy with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial interval
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Set the interval cap
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Set the multiplier; values below 1.0 are raised to 1.0
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Set maximum attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the required commitment
    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = commitment;
        self
    }

    /// Delay to wait after poll number `attempt` (0-indexed)
    pub fn interval_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(64) as i32);
        let millis = self.initial_interval.as_millis() as f64 * factor;
        let capped = millis.min(self.max_interval.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Outcome of waiting for a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Reached the requested commitment without error
    Confirmed,
    /// Landed with an execution error
    Failed(String),
    /// Attempts exhausted before the commitment was reached
    TimedOut,
}

impl ConfirmationStatus {
    /// True for [`ConfirmationStatus::Confirmed`]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmationStatus::Confirmed)
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationStatus::Confirmed => f.write_str("confirmed"),
            ConfirmationStatus::Failed(err) => write!(f, "failed: {err}"),
            ConfirmationStatus::TimedOut => f.write_str("timed out"),
        }
    }
}

/// One entry of `getSignatureStatuses`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    /// Slot the transaction landed in
    pub slot: u64,
    /// Execution error, `null` on success
    #[serde(default)]
    pub err: Option<Value>,
    /// Commitment reached so far
    #[serde(default)]
    pub confirmation_status: Option<Commitment>,
}

#[derive(Debug, Deserialize)]
struct RpcValue<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
}

/// Solana JSON-RPC client bound to one cluster endpoint
pub struct SolanaRpc {
    client: Arc<RpcClient>,
    rpc_url: String,
}

impl SolanaRpc {
    /// Creates a client for `rpc_url`
    pub fn new(client: Arc<RpcClient>, rpc_url: impl Into<String>) -> Self {
        Self {
            client,
            rpc_url: rpc_url.into(),
        }
    }

    /// Cluster endpoint
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Fetches a finalized recent blockhash
    pub async fn latest_blockhash(&self) -> crate::Result<String> {
        let resp: RpcValue<BlockhashValue> = self
            .client
            .rpc_call(
                &self.rpc_url,
                "getLatestBlockhash",
                json!([{ "commitment": Commitment::Finalized.as_str() }]),
            )
            .await?;
        Ok(resp.value.blockhash)
    }

    /// Submits a signed, wire-encoded transaction; returns its signature
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> crate::Result<String> {
        let encoded = STANDARD.encode(raw);
        let signature: String = self
            .client
            .rpc_call(
                &self.rpc_url,
                "sendTransaction",
                json!([encoded, { "encoding": "base64" }]),
            )
            .await?;
        if signature.is_empty() {
            return Err(ProviderError::UnexpectedResponse {
                method: "sendTransaction".into(),
                reason: "empty signature".into(),
            });
        }
        Ok(signature)
    }

    /// Current status of `signature`; `None` while the cluster has not seen it
    pub async fn signature_status(&self, signature: &str) -> crate::Result<Option<SignatureStatus>> {
        let resp: RpcValue<Vec<Option<SignatureStatus>>> = self
            .client
            .rpc_call(
                &self.rpc_url,
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(resp.value.into_iter().next().flatten())
    }

    /// Polls until `signature` reaches the policy's commitment, fails, or
    /// attempts run out. Transport errors count as a failed poll.
    pub async fn confirm_transaction(
        &self,
        signature: &str,
        policy: &ConfirmationPolicy,
    ) -> ConfirmationStatus {
        for attempt in 0..policy.max_attempts {
            match self.signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(err) = status.err.filter(|e| !e.is_null()) {
                        return ConfirmationStatus::Failed(err.to_string());
                    }
                    if status
                        .confirmation_status
                        .is_some_and(|c| c >= policy.commitment)
                    {
                        return ConfirmationStatus::Confirmed;
                    }
                    tracing::debug!(signature, attempt, slot = status.slot, "awaiting commitment");
                }
                Ok(None) => tracing::debug!(signature, attempt, "signature not yet seen"),
                Err(e) => tracing::debug!(signature, attempt, error = %e, "status poll failed"),
            }
            if attempt + 1 < policy.max_attempts {
                tokio::time::sleep(policy.interval_for(attempt)).await;
            }
        }
        ConfirmationStatus::TimedOut
    }
}

impl fmt::Debug for SolanaRpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolanaRpc").field("rpc_url", &self.rpc_url).finish()
    }
}
