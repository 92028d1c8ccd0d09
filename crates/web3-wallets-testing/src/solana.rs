use crate::lock;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use web3_wallets_error::{Result, WalletsError};
use web3_wallets_traits::{ProviderRpcError, SolanaProvider, SolanaTransaction, TransactionSigner};

/// In-memory Phantom provider
pub struct MockSolanaProvider {
    is_phantom: bool,
    key: String,
    connected: Mutex<Option<String>>,
    trusted: bool,
    connect_error: Mutex<Option<ProviderRpcError>>,
    sign_error: Mutex<Option<ProviderRpcError>>,
    connect_calls: Mutex<Vec<bool>>,
    sign_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl MockSolanaProvider {
    /// Phantom holding `key`, which has already trusted the dapp
    pub fn new(key: &str) -> Self {
        Self {
            is_phantom: true,
            key: key.to_string(),
            connected: Mutex::new(None),
            trusted: true,
            connect_error: Mutex::new(None),
            sign_error: Mutex::new(None),
            connect_calls: Mutex::new(Vec::new()),
            sign_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        }
    }

    /// Identifies as another Solana wallet
    pub fn not_phantom(mut self) -> Self {
        self.is_phantom = false;
        self
    }

    /// The dapp has not been trusted yet; silent connects are rejected
    pub fn untrusted(mut self) -> Self {
        self.trusted = false;
        self
    }

    /// Makes every connect fail with `error`
    pub fn fail_connect(&self, error: ProviderRpcError) {
        *lock(&self.connect_error) = Some(error);
    }

    /// Makes every signature request fail with `error`
    pub fn fail_sign(&self, error: ProviderRpcError) {
        *lock(&self.sign_error) = Some(error);
    }

    /// `only_if_trusted` flag of each connect call
    pub fn connect_calls(&self) -> Vec<bool> {
        lock(&self.connect_calls).clone()
    }

    /// `sign_transaction` calls so far
    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    /// `disconnect` calls so far
    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SolanaProvider for MockSolanaProvider {
    fn is_phantom(&self) -> bool {
        self.is_phantom
    }

    fn public_key(&self) -> Option<String> {
        lock(&self.connected).clone()
    }

    async fn connect(&self, only_if_trusted: bool) -> std::result::Result<String, ProviderRpcError> {
        lock(&self.connect_calls).push(only_if_trusted);
        if let Some(e) = lock(&self.connect_error).clone() {
            return Err(e);
        }
        if only_if_trusted && !self.trusted {
            return Err(ProviderRpcError::user_rejected());
        }
        *lock(&self.connected) = Some(self.key.clone());
        Ok(self.key.clone())
    }

    async fn sign_transaction(
        &self,
        tx: Box<dyn SolanaTransaction>,
    ) -> std::result::Result<Box<dyn SolanaTransaction>, ProviderRpcError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = lock(&self.sign_error).clone() {
            return Err(e);
        }
        Ok(tx)
    }

    async fn disconnect(&self) -> std::result::Result<(), ProviderRpcError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.connected).take();
        Ok(())
    }
}

/// Observable state of a [`MockSolanaTransaction`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxState {
    /// Fee payer set by the adapter
    pub fee_payer: Option<String>,
    /// Blockhash set by the host or the adapter
    pub recent_blockhash: Option<String>,
    /// Public keys of co-signers, in signing order
    pub signers: Vec<String>,
    /// Times the transaction was serialized
    pub serialize_calls: usize,
}

/// Transaction whose clones share state, so a test can keep a handle after
/// boxing one into the adapter
#[derive(Debug, Clone, Default)]
pub struct MockSolanaTransaction {
    state: Arc<Mutex<TxState>>,
}

impl MockSolanaTransaction {
    /// Empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Transaction that already carries a blockhash
    pub fn with_blockhash(blockhash: &str) -> Self {
        let tx = Self::default();
        lock(&tx.state).recent_blockhash = Some(blockhash.to_string());
        tx
    }

    /// Current state
    pub fn state(&self) -> TxState {
        lock(&self.state).clone()
    }
}

impl SolanaTransaction for MockSolanaTransaction {
    fn fee_payer(&self) -> Option<String> {
        lock(&self.state).fee_payer.clone()
    }

    fn set_fee_payer(&mut self, fee_payer: String) {
        lock(&self.state).fee_payer = Some(fee_payer);
    }

    fn recent_blockhash(&self) -> Option<String> {
        lock(&self.state).recent_blockhash.clone()
    }

    fn set_recent_blockhash(&mut self, blockhash: String) {
        lock(&self.state).recent_blockhash = Some(blockhash);
    }

    fn partial_sign(&mut self, signers: &[Arc<dyn TransactionSigner>]) -> Result<()> {
        let mut state = lock(&self.state);
        for signer in signers {
            if signer.sign_message(b"mock message").is_empty() {
                return Err(WalletsError::SigningError(format!(
                    "empty signature from {}",
                    signer.public_key()
                )));
            }
            state.signers.push(signer.public_key());
        }
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut state = lock(&self.state);
        state.serialize_calls += 1;
        let fee_payer = state
            .fee_payer
            .clone()
            .ok_or_else(|| WalletsError::SigningError("Transaction fee payer required".into()))?;
        let blockhash = state
            .recent_blockhash
            .clone()
            .ok_or_else(|| WalletsError::SigningError("Transaction recentBlockhash required".into()))?;
        Ok(serde_json::to_vec(&json!({
            "feePayer": fee_payer,
            "recentBlockhash": blockhash,
            "signers": state.signers,
        }))?)
    }
}

/// Co-signer returning a fixed signature
#[derive(Debug, Clone)]
pub struct MockSigner {
    key: String,
}

impl MockSigner {
    /// Signer with public key `key`
    pub fn new(key: &str) -> Self {
        Self { key: key.to_string() }
    }
}

impl TransactionSigner for MockSigner {
    fn public_key(&self) -> String {
        self.key.clone()
    }

    fn sign_message(&self, _message: &[u8]) -> Vec<u8> {
        vec![7u8; 64]
    }
}
