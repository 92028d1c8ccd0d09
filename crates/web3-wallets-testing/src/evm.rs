use crate::lock;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use web3_wallets_traits::{EvmEvent, EvmEventKind, EvmListener, EvmProvider, ListenerId, ProviderRpcError};

type RpcResult = Result<Value, ProviderRpcError>;

/// In-memory injected EVM provider.
///
/// Unless a response is queued with [`MockEvmProvider::push_response`], the
/// mock behaves like an unlocked MetaMask that knows every chain: account
/// requests return the configured accounts, chain switches succeed and update
/// the cached chain id, and `eth_sendTransaction` returns a fresh hash.
pub struct MockEvmProvider {
    is_metamask: bool,
    chain_id: Mutex<Option<String>>,
    accounts: Mutex<Vec<String>>,
    unlocked: AtomicBool,
    queued: Mutex<HashMap<String, VecDeque<RpcResult>>>,
    calls: Mutex<Vec<(String, Value)>>,
    listeners: Mutex<Vec<(EvmEventKind, ListenerId, EvmListener)>>,
    next_listener: AtomicU64,
}

impl MockEvmProvider {
    /// MetaMask on Ethereum mainnet with one account
    pub fn new() -> Self {
        Self {
            is_metamask: true,
            chain_id: Mutex::new(Some("0x1".to_string())),
            accounts: Mutex::new(vec![crate::EdgeCaseAddresses::ETH_VALID.to_string()]),
            unlocked: AtomicBool::new(true),
            queued: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Replaces the accounts returned by `eth_requestAccounts`
    pub fn with_accounts(self, accounts: Vec<String>) -> Self {
        *lock(&self.accounts) = accounts;
        self
    }

    /// Sets the cached hex chain id
    pub fn with_chain_id(self, chain_id: &str) -> Self {
        *lock(&self.chain_id) = Some(chain_id.to_string());
        self
    }

    /// Identifies as some other injected wallet
    pub fn not_metamask(mut self) -> Self {
        self.is_metamask = false;
        self
    }

    /// Sets the unlocked state reported to restore
    pub fn with_unlocked(self, unlocked: bool) -> Self {
        self.unlocked.store(unlocked, Ordering::SeqCst);
        self
    }

    /// Queues a one-shot response for `method`
    pub fn push_response(&self, method: &str, result: RpcResult) {
        lock(&self.queued)
            .entry(method.to_string())
            .or_default()
            .push_back(result);
    }

    /// Every request made so far
    pub fn calls(&self) -> Vec<(String, Value)> {
        lock(&self.calls).clone()
    }

    /// Params of every request to `method`
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        lock(&self.calls)
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Registered listeners of `kind`
    pub fn listener_count(&self, kind: EvmEventKind) -> usize {
        lock(&self.listeners).iter().filter(|(k, _, _)| *k == kind).count()
    }

    /// Invokes every listener registered for the event's kind
    pub fn emit(&self, event: EvmEvent) {
        let kind = event.kind();
        let targets: Vec<EvmListener> = lock(&self.listeners)
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, l)| l.clone())
            .collect();
        for listener in targets {
            listener(event.clone());
        }
    }

    fn set_chain_from_params(&self, params: &Value) {
        if let Some(chain) = params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(Value::as_str)
        {
            *lock(&self.chain_id) = Some(chain.to_string());
        }
    }
}

impl Default for MockEvmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EvmProvider for MockEvmProvider {
    fn is_metamask(&self) -> bool {
        self.is_metamask
    }

    fn chain_id(&self) -> Option<String> {
        lock(&self.chain_id).clone()
    }

    async fn request(&self, method: &str, params: Value) -> RpcResult {
        let call_index = {
            let mut calls = lock(&self.calls);
            calls.push((method.to_string(), params.clone()));
            calls.len()
        };

        if let Some(result) = lock(&self.queued)
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            if result.is_ok() && method.starts_with("wallet_") {
                self.set_chain_from_params(&params);
            }
            return result;
        }

        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!(lock(&self.accounts).clone())),
            "eth_chainId" => Ok(json!(lock(&self.chain_id).clone())),
            "wallet_switchEthereumChain" | "wallet_addEthereumChain" => {
                self.set_chain_from_params(&params);
                Ok(Value::Null)
            }
            "eth_sendTransaction" => Ok(json!(format!("0x{call_index:064x}"))),
            other => Err(ProviderRpcError::new(-32601, format!("method {other} not found"))),
        }
    }

    fn on(&self, kind: EvmEventKind, listener: EvmListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        lock(&self.listeners).push((kind, id, listener));
        id
    }

    fn remove_listener(&self, kind: EvmEventKind, id: ListenerId) {
        lock(&self.listeners).retain(|(k, i, _)| !(*k == kind && *i == id));
    }

    async fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }
}
