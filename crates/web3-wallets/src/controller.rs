//! Session controller.
//!
//! [`WalletController`] owns the three adapters and the published [`Session`].
//! Every state change is one `send_modify` on a watch channel, so nothing
//! holds a lock across an await. Wallet-originated changes arrive as
//! [`WalletEvent`]s and are applied by [`WalletController::run_events`].

use crate::adapters::{
    ConfirmationEvent, ConnectOptions, MetaMaskAdapter, PhantomAdapter, Transaction,
    WalletAdapter, WalletConnectAdapter, WalletEvent,
};
use crate::address::{lookup_domain, NameResolvers};
use crate::browser::{redirect_to_install, NoopNavigator, TracingNotifier};
use crate::config::WalletsConfig;
use crate::session::Session;
use crate::storage::MemoryStore;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use web3_wallets_error::{Result, WalletsError};
use web3_wallets_provider::{
    DomainLookupClient, EnsClient, RpcClient, SnsClient, StaticNetworkRegistry,
};
use web3_wallets_traits::{
    ChainId, EvmProvider, KeyValueStore, NameService, Navigator, NetworkRegistry, Notifier,
    RelayConnector, SolanaProvider, TxHash, WalletName,
};

/// Builder for [`WalletController`]; every service has a default
pub struct WalletControllerBuilder {
    config: WalletsConfig,
    metamask: Option<Arc<dyn EvmProvider>>,
    relay: Option<Arc<dyn RelayConnector>>,
    phantom: Option<Arc<dyn SolanaProvider>>,
    store: Option<Arc<dyn KeyValueStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    notifier: Option<Arc<dyn Notifier>>,
    registry: Option<Arc<dyn NetworkRegistry>>,
    evm_names: Option<Arc<dyn NameService>>,
    solana_names: Option<Arc<dyn NameService>>,
    rpc_client: Option<Arc<RpcClient>>,
}

impl WalletControllerBuilder {
    fn new(config: WalletsConfig) -> Self {
        Self {
            config,
            metamask: None,
            relay: None,
            phantom: None,
            store: None,
            navigator: None,
            notifier: None,
            registry: None,
            evm_names: None,
            solana_names: None,
            rpc_client: None,
        }
    }

    /// Injected EVM provider (`window.ethereum`)
    pub fn metamask(mut self, provider: Arc<dyn EvmProvider>) -> Self {
        self.metamask = Some(provider);
        self
    }

    /// WalletConnect client factory
    pub fn walletconnect(mut self, connector: Arc<dyn RelayConnector>) -> Self {
        self.relay = Some(connector);
        self
    }

    /// Injected Solana provider (`window.solana`)
    pub fn phantom(mut self, provider: Arc<dyn SolanaProvider>) -> Self {
        self.phantom = Some(provider);
        self
    }

    /// Durable store for the wallet choice; defaults to [`MemoryStore`]
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Browser location; defaults to [`NoopNavigator`]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// User-visible warnings; defaults to [`TracingNotifier`]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Network registry; defaults to [`StaticNetworkRegistry::new`]
    pub fn registry(mut self, registry: Arc<dyn NetworkRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// ENS service; defaults to ENS over the registry's mainnet RPC with
    /// reverse lookups through the domain service
    pub fn evm_names(mut self, names: Arc<dyn NameService>) -> Self {
        self.evm_names = Some(names);
        self
    }

    /// `.sol` service; defaults to the SNS proxy
    pub fn solana_names(mut self, names: Arc<dyn NameService>) -> Self {
        self.solana_names = Some(names);
        self
    }

    /// Shared HTTP client
    pub fn rpc_client(mut self, client: Arc<RpcClient>) -> Self {
        self.rpc_client = Some(client);
        self
    }

    /// Validates the configuration and wires the adapters
    pub fn build(self) -> Result<WalletController> {
        self.config.validate()?;
        let config = self.config;

        let rpc = match self.rpc_client {
            Some(client) => client,
            None => Arc::new(RpcClient::new()?),
        };
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(StaticNetworkRegistry::new()));
        let evm_names = match self.evm_names {
            Some(names) => names,
            None => {
                let mainnet = registry
                    .network(ChainId::ETHEREUM)
                    .ok_or(WalletsError::UnknownNetwork(ChainId::ETHEREUM.value()))?;
                let domains = Arc::new(DomainLookupClient::new(rpc.clone(), &config.domain_lookup_url));
                Arc::new(EnsClient::new(rpc.clone(), mainnet.rpc_url).with_reverse_lookup(domains))
                    as Arc<dyn NameService>
            }
        };
        let solana_names = self
            .solana_names
            .unwrap_or_else(|| Arc::new(SnsClient::new(rpc.clone(), &config.sns_proxy_url)));
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier));

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let metamask = MetaMaskAdapter::new(
            self.metamask,
            registry.clone(),
            evm_names.clone(),
            events_tx.clone(),
        );
        let walletconnect = WalletConnectAdapter::new(
            self.relay,
            config.bridge_url.clone(),
            registry,
            evm_names.clone(),
            notifier,
            events_tx,
        );
        let phantom = PhantomAdapter::new(self.phantom, solana_names.clone(), rpc, config.clone());
        let (state, _) = watch::channel(Session::default());

        Ok(WalletController {
            inner: Arc::new(Inner {
                metamask,
                walletconnect,
                phantom,
                store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
                navigator: self.navigator.unwrap_or_else(|| Arc::new(NoopNavigator)),
                resolvers: NameResolvers::new(evm_names, solana_names),
                config,
                state,
                events: Mutex::new(events_rx),
            }),
        })
    }
}

struct Inner {
    config: WalletsConfig,
    metamask: MetaMaskAdapter,
    walletconnect: WalletConnectAdapter,
    phantom: PhantomAdapter,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    resolvers: NameResolvers,
    state: watch::Sender<Session>,
    events: Mutex<mpsc::UnboundedReceiver<WalletEvent>>,
}

/// Owner of the wallet session. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct WalletController {
    inner: Arc<Inner>,
}

impl WalletController {
    /// Starts a builder with `config`
    pub fn builder(config: WalletsConfig) -> WalletControllerBuilder {
        WalletControllerBuilder::new(config)
    }

    /// Active configuration
    pub fn config(&self) -> &WalletsConfig {
        &self.inner.config
    }

    /// Current session snapshot
    pub fn state(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Outcomes of Solana transactions sent through Phantom
    pub fn subscribe_confirmations(&self) -> broadcast::Receiver<ConfirmationEvent> {
        self.inner.phantom.subscribe_confirmations()
    }

    /// Name services used for domain lookups and address validation
    pub fn resolvers(&self) -> &NameResolvers {
        &self.inner.resolvers
    }

    /// MetaMask adapter
    pub fn metamask(&self) -> &MetaMaskAdapter {
        &self.inner.metamask
    }

    /// WalletConnect adapter
    pub fn walletconnect(&self) -> &WalletConnectAdapter {
        &self.inner.walletconnect
    }

    /// Phantom adapter
    pub fn phantom(&self) -> &PhantomAdapter {
        &self.inner.phantom
    }

    fn adapter(&self, name: WalletName) -> &dyn WalletAdapter {
        match name {
            WalletName::MetaMask => &self.inner.metamask,
            WalletName::WalletConnect => &self.inner.walletconnect,
            WalletName::Phantom => &self.inner.phantom,
        }
    }

    fn active_wallet(&self) -> Option<WalletName> {
        self.inner.state.borrow().wallet_name
    }

    fn set_loading(&self, loading: bool) {
        self.inner.state.send_modify(|s| s.is_loading = loading);
    }

    fn persist_choice(&self, name: WalletName) {
        if let Err(e) = self.inner.store.set(&self.inner.config.storage_key, name.as_str()) {
            tracing::warn!(wallet = %name, error = %e, "can't persist wallet choice");
        }
    }

    async fn kill_stale_relay(&self) {
        if let Err(e) = self
            .inner
            .walletconnect
            .connect(ConnectOptions::passive(None))
            .await
        {
            tracing::warn!(error = %e, "walletconnect cleanup failed");
        }
    }

    /// Reconnects the wallet persisted by the last successful `connect`,
    /// without prompting the user
    pub async fn restore(&self) -> Result<bool> {
        self.set_loading(true);
        let restored = self.restore_inner().await;
        self.set_loading(false);
        restored
    }

    async fn restore_inner(&self) -> Result<bool> {
        self.kill_stale_relay().await;

        let stored = match self.inner.store.get(&self.inner.config.storage_key) {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(false),
            Err(e) => {
                tracing::warn!(error = %e, "can't read wallet choice");
                return Ok(false);
            }
        };
        let name = match stored.parse::<WalletName>() {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring persisted wallet choice");
                return Ok(false);
            }
        };

        let connection = match name {
            WalletName::MetaMask => {
                let metamask = &self.inner.metamask;
                if !metamask.is_available() || !metamask.is_unlocked().await {
                    tracing::info!("metamask locked or missing, not restoring");
                    return Ok(false);
                }
                metamask.connect(ConnectOptions::passive(None)).await?
            }
            WalletName::Phantom => {
                self.inner
                    .phantom
                    .connect(ConnectOptions::passive(Some(ChainId::SOLANA_MAINNET)))
                    .await?
            }
            WalletName::WalletConnect => {
                tracing::debug!("walletconnect sessions are not restored");
                return Ok(false);
            }
        };

        match connection {
            Some(connection) => {
                tracing::info!(wallet = %name, address = %connection.address, "session restored");
                self.inner.state.send_modify(|s| s.apply_connection(connection));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Connects `name`, switching to `chain_id` when given.
    ///
    /// Returns `Ok(false)` when the user declined, the wallet is not installed
    /// (the user is sent to install it), or the wallet ended up on the wrong
    /// network.
    pub async fn connect(&self, name: WalletName, chain_id: Option<ChainId>) -> Result<bool> {
        let adapter = self.adapter(name);
        if name != WalletName::WalletConnect && !adapter.is_available() {
            redirect_to_install(&self.inner.config, self.inner.navigator.as_ref(), name);
            return Ok(false);
        }

        self.set_loading(true);
        // an active relay session is torn down only once the new wallet connects
        if name != WalletName::WalletConnect
            && self.active_wallet() != Some(WalletName::WalletConnect)
        {
            self.kill_stale_relay().await;
        }
        let result = adapter.connect(ConnectOptions::interactive(chain_id)).await;
        self.set_loading(false);

        let Some(connection) = result? else {
            tracing::info!(wallet = %name, "not connected");
            return Ok(false);
        };

        if let Some(previous) = self.active_wallet().filter(|p| *p != name) {
            if let Err(e) = self.adapter(previous).disconnect().await {
                tracing::warn!(wallet = %previous, error = %e, "previous wallet teardown failed");
            }
        }

        tracing::info!(wallet = %name, address = %connection.address, chain_id = %connection.chain_id, "wallet connected");
        self.inner.state.send_modify(|s| s.apply_connection(connection));
        self.persist_choice(name);
        Ok(true)
    }

    /// [`connect`](Self::connect) by wallet name as persisted or shown in the UI
    pub async fn connect_by_name(&self, name: &str, chain_id: Option<ChainId>) -> Result<bool> {
        let name = name.parse::<WalletName>()?;
        self.connect(name, chain_id).await
    }

    /// Asks `name` to move to `chain_id`
    pub async fn change_network(&self, name: WalletName, chain_id: ChainId) -> Result<bool> {
        let switched = self.adapter(name).change_network(chain_id).await?;
        if switched && name == WalletName::MetaMask && self.active_wallet() == Some(name) {
            self.inner.state.send_modify(|s| s.chain_id = Some(chain_id));
        }
        Ok(switched)
    }

    /// Sends `tx` through the active wallet on the session's chain
    pub async fn send_tx(&self, tx: Transaction) -> Result<Option<TxHash>> {
        let (wallet, chain_id) = {
            let state = self.inner.state.borrow();
            (state.wallet_name, state.chain_id)
        };
        let wallet = wallet.ok_or(WalletsError::NotConnected)?;
        self.adapter(wallet).send_transaction(chain_id, tx).await
    }

    /// Tears down the active wallet, resets the session and forgets the
    /// persisted choice. Teardown failures are logged; the reset always happens.
    pub async fn disconnect(&self) {
        if let Some(wallet) = self.active_wallet() {
            if let Err(e) = self.adapter(wallet).disconnect().await {
                tracing::warn!(%wallet, error = %e, "wallet teardown failed");
            }
        }
        self.inner.state.send_modify(Session::reset);
        if let Err(e) = self.inner.store.remove(&self.inner.config.storage_key) {
            tracing::warn!(error = %e, "can't erase wallet choice");
        }
        tracing::info!("session reset");
    }

    /// Applies one wallet event to the session
    pub async fn handle_event(&self, event: WalletEvent) {
        let active = self.active_wallet();
        match event {
            WalletEvent::ChainChanged(chain_id) if active == Some(WalletName::MetaMask) => {
                tracing::info!(%chain_id, "metamask chain changed");
                self.inner.state.send_modify(|s| s.chain_id = Some(chain_id));
            }
            WalletEvent::AccountsChanged(accounts) if active == Some(WalletName::MetaMask) => {
                match accounts.into_iter().next() {
                    None => {
                        tracing::info!("metamask revoked all accounts");
                        self.disconnect().await;
                    }
                    Some(address) => {
                        let domain = lookup_domain(self.inner.resolvers.ens.as_ref(), &address).await;
                        tracing::info!(%address, "metamask account changed");
                        self.inner.state.send_modify(|s| s.set_account(address, domain));
                    }
                }
            }
            WalletEvent::RelaySessionUpdate { accounts, chain_id }
                if active == Some(WalletName::WalletConnect) =>
            {
                tracing::info!(%chain_id, "walletconnect session updated");
                let current = self.inner.state.borrow().address.clone();
                let account = accounts.into_iter().next().filter(|a| Some(a) != current.as_ref());
                let domain = match &account {
                    Some(address) => lookup_domain(self.inner.resolvers.ens.as_ref(), address).await,
                    None => None,
                };
                self.inner.state.send_modify(|s| {
                    s.chain_id = Some(chain_id);
                    if let Some(address) = account {
                        s.set_account(address, domain);
                    }
                });
            }
            WalletEvent::RelayDisconnected(reason)
                if active.is_none() || active == Some(WalletName::WalletConnect) =>
            {
                tracing::info!(%reason, "walletconnect session closed");
                self.disconnect().await;
            }
            other => tracing::debug!(event = ?other, wallet = ?active, "event not for the active wallet"),
        }
    }

    /// Applies wallet events until `cancel` fires
    pub async fn run_events(&self, cancel: CancellationToken) {
        let mut events = self.inner.events.lock().await;
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Some(event) => self.handle_event(event).await,
                None => break,
            }
        }
        tracing::debug!("event loop stopped");
    }

    /// Applies every event already queued; returns how many were applied.
    /// Does nothing while [`run_events`](Self::run_events) owns the queue.
    pub async fn process_pending_events(&self) -> usize {
        let mut processed = 0;
        loop {
            let next = match self.inner.events.try_lock() {
                Ok(mut events) => events.try_recv().ok(),
                Err(_) => None,
            };
            let Some(event) = next else {
                return processed;
            };
            self.handle_event(event).await;
            processed += 1;
        }
    }

    /// Waits for the next event and applies it
    pub async fn process_next_event(&self) -> bool {
        let next = self.inner.events.lock().await.recv().await;
        match next {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for WalletController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletController")
            .field("session", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}
