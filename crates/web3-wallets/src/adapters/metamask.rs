use super::{emit, ConnectOptions, EventSender, Transaction, WalletAdapter, WalletEvent};
use crate::address::lookup_domain;
use crate::lock;
use crate::session::{ActiveProvider, Connection};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use web3_wallets_error::{Result, WalletsError};
use web3_wallets_traits::{
    AddEthereumChainParameter, ChainId, EvmEvent, EvmEventKind, EvmProvider, ListenerId,
    NameService, NetworkRegistry, TxHash, WalletName,
};

#[derive(Default)]
struct Subscription {
    subscribed: bool,
    listeners: Vec<(EvmEventKind, ListenerId)>,
}

/// MetaMask over an injected EIP-1193 provider
pub struct MetaMaskAdapter {
    provider: Option<Arc<dyn EvmProvider>>,
    registry: Arc<dyn NetworkRegistry>,
    names: Arc<dyn NameService>,
    events: EventSender,
    subscription: Mutex<Subscription>,
}

impl MetaMaskAdapter {
    pub(crate) fn new(
        provider: Option<Arc<dyn EvmProvider>>,
        registry: Arc<dyn NetworkRegistry>,
        names: Arc<dyn NameService>,
        events: EventSender,
    ) -> Self {
        Self {
            provider,
            registry,
            names,
            events,
            subscription: Mutex::new(Subscription::default()),
        }
    }

    fn metamask(&self) -> Option<&Arc<dyn EvmProvider>> {
        self.provider.as_ref().filter(|p| p.is_metamask())
    }

    /// Extension unlocked state; false when MetaMask is absent
    pub async fn is_unlocked(&self) -> bool {
        match self.metamask() {
            Some(provider) => provider.is_unlocked().await,
            None => false,
        }
    }

    /// True while the chain and account listeners are registered
    pub fn is_subscribed(&self) -> bool {
        lock(&self.subscription).subscribed
    }

    fn current_chain(provider: &dyn EvmProvider) -> Option<ChainId> {
        let hex = provider.chain_id()?;
        match ChainId::from_hex(&hex) {
            Ok(chain) => Some(chain),
            Err(e) => {
                tracing::warn!(chain_id = %hex, error = %e, "provider reported an unparsable chain id");
                None
            }
        }
    }

    fn switch_params(&self, chain_id: ChainId) -> Result<Vec<AddEthereumChainParameter>> {
        let network = self
            .registry
            .network(chain_id)
            .ok_or(WalletsError::UnknownNetwork(chain_id.value()))?;
        network
            .params
            .filter(|p| !p.is_empty())
            .ok_or(WalletsError::MissingNetworkParams(chain_id.value()))
    }

    /// `wallet_switchEthereumChain`, falling back to `wallet_addEthereumChain`
    /// when the wallet does not know the chain (4902)
    async fn switch_network(
        &self,
        provider: &dyn EvmProvider,
        params: Vec<AddEthereumChainParameter>,
    ) -> bool {
        let chain_hex = params[0].chain_id.clone();
        match provider
            .request("wallet_switchEthereumChain", json!([{ "chainId": chain_hex }]))
            .await
        {
            Ok(_) => true,
            Err(e) if e.is_unrecognized_chain() => {
                tracing::info!(chain_id = %chain_hex, "chain unknown to wallet, adding it");
                match provider.request("wallet_addEthereumChain", json!(params)).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(chain_id = %chain_hex, error = %e, "can't add the network");
                        false
                    }
                }
            }
            Err(e) => {
                tracing::warn!(chain_id = %chain_hex, error = %e, "can't change network");
                false
            }
        }
    }

    /// Registers the chain and account listeners unless already registered
    fn subscribe(&self, provider: &dyn EvmProvider) {
        let mut subscription = lock(&self.subscription);
        if subscription.subscribed {
            return;
        }

        let events = self.events.clone();
        let chain_id = provider.on(
            EvmEventKind::ChainChanged,
            Arc::new(move |event| {
                if let EvmEvent::ChainChanged(hex) = event {
                    match ChainId::from_hex(&hex) {
                        Ok(chain) => emit(&events, WalletEvent::ChainChanged(chain)),
                        Err(e) => tracing::warn!(chain_id = %hex, error = %e, "ignoring chainChanged"),
                    }
                }
            }),
        );

        let events = self.events.clone();
        let accounts_id = provider.on(
            EvmEventKind::AccountsChanged,
            Arc::new(move |event| {
                if let EvmEvent::AccountsChanged(accounts) = event {
                    emit(&events, WalletEvent::AccountsChanged(accounts));
                }
            }),
        );

        subscription.listeners = vec![
            (EvmEventKind::ChainChanged, chain_id),
            (EvmEventKind::AccountsChanged, accounts_id),
        ];
        subscription.subscribed = true;
        tracing::debug!("metamask listeners registered");
    }

    fn unsubscribe(&self) {
        let mut subscription = lock(&self.subscription);
        let listeners = std::mem::take(&mut subscription.listeners);
        subscription.subscribed = false;
        if let Some(provider) = &self.provider {
            for (kind, id) in listeners {
                provider.remove_listener(kind, id);
            }
        }
    }
}

#[async_trait]
impl WalletAdapter for MetaMaskAdapter {
    fn name(&self) -> WalletName {
        WalletName::MetaMask
    }

    fn is_available(&self) -> bool {
        self.metamask().is_some()
    }

    async fn connect(&self, options: ConnectOptions) -> Result<Option<Connection>> {
        let Some(provider) = self.metamask().cloned() else {
            return Ok(None);
        };

        let accounts = match provider.request("eth_requestAccounts", json!([])).await {
            Ok(accounts) => accounts,
            Err(e) if e.is_user_rejection() => {
                tracing::warn!(error = %e, "user rejected the request");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let Some(address) = accounts
            .get(0)
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            tracing::warn!(%accounts, "wallet returned no accounts");
            return Ok(None);
        };
        tracing::info!(%address, "metamask accounts granted");

        let domain = lookup_domain(self.names.as_ref(), &address).await;

        let mut chain_id = Self::current_chain(provider.as_ref());
        if let Some(target) = options.chain_id {
            let params = self.switch_params(target)?;
            if chain_id != Some(target) && self.switch_network(provider.as_ref(), params).await {
                chain_id = Some(target);
            }
        }
        let chain_id = match chain_id {
            Some(chain) => chain,
            None => {
                let reported = provider.request("eth_chainId", json!([])).await?;
                ChainId::from_hex(reported.as_str().unwrap_or_default())?
            }
        };

        self.subscribe(provider.as_ref());

        Ok(Some(Connection {
            address,
            chain_id,
            domain,
            provider: ActiveProvider::MetaMask(provider),
        }))
    }

    async fn disconnect(&self) -> Result<()> {
        self.unsubscribe();
        Ok(())
    }

    async fn send_transaction(&self, _chain_id: Option<ChainId>, tx: Transaction) -> Result<Option<TxHash>> {
        let provider = self
            .metamask()
            .ok_or_else(|| WalletsError::ProviderUnavailable("MetaMask".into()))?;
        let Transaction::Evm(tx) = tx else {
            return Err(WalletsError::NotSupported(
                "MetaMask sends EVM transactions only".into(),
            ));
        };

        let hash = provider.request("eth_sendTransaction", json!([tx])).await?;
        match hash.as_str() {
            Some(hash) => Ok(Some(TxHash::new(hash))),
            None => Err(WalletsError::BroadcastError(format!(
                "unexpected eth_sendTransaction result {hash}"
            ))),
        }
    }

    async fn change_network(&self, chain_id: ChainId) -> Result<bool> {
        let provider = self
            .metamask()
            .ok_or_else(|| WalletsError::ProviderUnavailable("MetaMask".into()))?;
        let params = self.switch_params(chain_id)?;
        Ok(self.switch_network(provider.as_ref(), params).await)
    }
}
