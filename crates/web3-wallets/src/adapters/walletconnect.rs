use super::{emit, ConnectOptions, EventSender, Transaction, WalletAdapter, WalletEvent};
use crate::address::lookup_domain;
use crate::lock;
use crate::session::{ActiveProvider, Connection};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use web3_wallets_error::{Result, WalletsError};
use web3_wallets_traits::transport::same_chain;
use web3_wallets_traits::{
    ChainId, DisconnectReason, NameService, NetworkRegistry, Notifier, RelayClient,
    RelayConnector, RelayEvent, RelayPayload, TxHash, WalletName,
};

/// Warning raised when the wallet paired on a different chain than requested
pub const WRONG_NETWORK_WARNING: &str = "Wrong wallet network — disconnected";

/// WalletConnect v1 over a bridge relay.
///
/// A fresh client is built from the connector on every `connect`, the way the
/// SDK restores a persisted session on construction. After a successful
/// pairing, relay events are forwarded to the controller by a background task
/// that stops on disconnect.
pub struct WalletConnectAdapter {
    connector: Option<Arc<dyn RelayConnector>>,
    bridge_url: String,
    registry: Arc<dyn NetworkRegistry>,
    names: Arc<dyn NameService>,
    notifier: Arc<dyn Notifier>,
    events: EventSender,
    client: Mutex<Option<Arc<dyn RelayClient>>>,
    forwarder: Mutex<Option<CancellationToken>>,
}

impl WalletConnectAdapter {
    pub(crate) fn new(
        connector: Option<Arc<dyn RelayConnector>>,
        bridge_url: impl Into<String>,
        registry: Arc<dyn NetworkRegistry>,
        names: Arc<dyn NameService>,
        notifier: Arc<dyn Notifier>,
        events: EventSender,
    ) -> Self {
        Self {
            connector,
            bridge_url: bridge_url.into(),
            registry,
            names,
            notifier,
            events,
            client: Mutex::new(None),
            forwarder: Mutex::new(None),
        }
    }

    /// True while a paired client is held and its session is alive
    pub fn has_session(&self) -> bool {
        lock(&self.client)
            .as_ref()
            .is_some_and(|client| client.is_connected())
    }

    async fn kill(client: &dyn RelayClient) {
        if let Err(e) = client.kill_session().await {
            tracing::warn!(error = %e, "can't kill walletconnect session");
        }
    }

    async fn pair(
        &self,
        client: Arc<dyn RelayClient>,
        chain_id: Option<ChainId>,
    ) -> Result<Option<Connection>> {
        let mut relay_events = client.subscribe();
        match client.create_session().await {
            Ok(()) => tracing::info!(bridge = %self.bridge_url, "pairing started, waiting for wallet"),
            Err(e) if e.is_user_rejection() => {
                tracing::warn!(error = %e, "user rejected the pairing");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        let Some(payload) = Self::await_connect(&mut relay_events, &self.events).await else {
            return Ok(None);
        };

        if !same_chain(payload.chain_id, chain_id) {
            tracing::warn!(
                wallet_chain = payload.chain_id,
                requested = ?chain_id,
                "wallet paired on another chain"
            );
            Self::kill(client.as_ref()).await;
            self.notifier.warn(WRONG_NETWORK_WARNING);
            return Ok(None);
        }

        let chain_id = ChainId::new(payload.chain_id);
        let Some(network) = self.registry.network(chain_id) else {
            Self::kill(client.as_ref()).await;
            return Err(WalletsError::UnknownNetwork(chain_id.value()));
        };
        let Some(address) = payload.accounts.into_iter().next() else {
            tracing::warn!("wallet approved without accounts");
            Self::kill(client.as_ref()).await;
            return Ok(None);
        };

        let domain = lookup_domain(self.names.as_ref(), &address).await;

        let token = CancellationToken::new();
        tokio::spawn(forward_events(relay_events, self.events.clone(), token.clone()));
        if let Some(previous) = lock(&self.forwarder).replace(token) {
            previous.cancel();
        }
        *lock(&self.client) = Some(client);

        tracing::info!(%address, %chain_id, "walletconnect session established");
        Ok(Some(Connection {
            address,
            chain_id,
            domain,
            provider: ActiveProvider::WalletConnect {
                rpc_url: network.rpc_url,
            },
        }))
    }

    /// Waits for the wallet's answer to a pairing; `None` on rejection or a
    /// closed relay
    async fn await_connect(
        relay_events: &mut broadcast::Receiver<RelayEvent>,
        events: &EventSender,
    ) -> Option<RelayPayload> {
        loop {
            match relay_events.recv().await {
                Ok(RelayEvent::Connect(payload)) => return Some(payload),
                Ok(RelayEvent::Disconnect { message }) => {
                    let reason = DisconnectReason::from_message(message.as_deref());
                    tracing::warn!(%reason, "pairing ended before connect");
                    emit(events, WalletEvent::RelayDisconnected(reason));
                    return None;
                }
                Ok(other) => tracing::debug!(event = ?other, "ignored while pairing"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "relay events lagged while pairing")
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

async fn forward_events(
    mut relay_events: broadcast::Receiver<RelayEvent>,
    events: EventSender,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = relay_events.recv() => event,
        };
        match event {
            Ok(RelayEvent::SessionUpdate(payload)) => emit(
                &events,
                WalletEvent::RelaySessionUpdate {
                    accounts: payload.accounts,
                    chain_id: ChainId::new(payload.chain_id),
                },
            ),
            Ok(RelayEvent::Disconnect { message }) => {
                let reason = DisconnectReason::from_message(message.as_deref());
                tracing::info!(%reason, "walletconnect session ended");
                emit(&events, WalletEvent::RelayDisconnected(reason));
                break;
            }
            Ok(other) => tracing::debug!(event = ?other, "relay event not handled"),
            Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "relay events lagged"),
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!("relay forwarder stopped");
}

#[async_trait]
impl WalletAdapter for WalletConnectAdapter {
    fn name(&self) -> WalletName {
        WalletName::WalletConnect
    }

    fn is_available(&self) -> bool {
        self.connector.is_some()
    }

    async fn connect(&self, options: ConnectOptions) -> Result<Option<Connection>> {
        let Some(connector) = &self.connector else {
            tracing::debug!("no walletconnect connector configured");
            return Ok(None);
        };
        let client = connector.connect(&self.bridge_url);

        match (client.is_connected(), options.show_qr) {
            (false, false) => Ok(None),
            (true, false) => {
                tracing::info!("killing stale walletconnect session");
                Self::kill(client.as_ref()).await;
                Ok(None)
            }
            (true, true) => {
                tracing::warn!("walletconnect session already exists");
                Ok(None)
            }
            (false, true) => self.pair(client, options.chain_id).await,
        }
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(token) = lock(&self.forwarder).take() {
            token.cancel();
        }
        let client = lock(&self.client).take();
        match client {
            Some(client) if client.is_connected() => {
                client.kill_session().await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn send_transaction(&self, _chain_id: Option<ChainId>, tx: Transaction) -> Result<Option<TxHash>> {
        let client = lock(&self.client).clone().ok_or(WalletsError::NotConnected)?;
        let Transaction::Evm(tx) = tx else {
            return Err(WalletsError::NotSupported(
                "WalletConnect sends EVM transactions only".into(),
            ));
        };

        let hash = client.send_transaction(tx).await?;
        match hash.as_str() {
            Some(hash) => Ok(Some(TxHash::new(hash))),
            None => Err(WalletsError::BroadcastError(format!(
                "unexpected relay send result {hash}"
            ))),
        }
    }

    async fn change_network(&self, chain_id: ChainId) -> Result<bool> {
        tracing::info!(%chain_id, "walletconnect v1 can't switch networks remotely");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;
    use web3_wallets_provider::StaticNetworkRegistry;
    use web3_wallets_testing::{
        EdgeCaseAddresses, MockRelayClient, MockRelayConnector, PairingOutcome, RecordingNotifier,
        StaticNameService,
    };
    use web3_wallets_traits::{ProviderRpcError, RelaySession};

    struct Fixture {
        adapter: WalletConnectAdapter,
        client: Arc<MockRelayClient>,
        connector: Arc<MockRelayConnector>,
        notifier: Arc<RecordingNotifier>,
        rx: mpsc::UnboundedReceiver<WalletEvent>,
    }

    fn fixture(client: MockRelayClient) -> Fixture {
        let client = Arc::new(client);
        let connector = Arc::new(MockRelayConnector::new(client.clone()));
        let notifier = Arc::new(RecordingNotifier::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let adapter = WalletConnectAdapter::new(
            Some(connector.clone()),
            "https://bridge.example.org",
            Arc::new(StaticNetworkRegistry::new()),
            Arc::new(StaticNameService::new()),
            notifier.clone(),
            tx,
        );
        Fixture {
            adapter,
            client,
            connector,
            notifier,
            rx,
        }
    }

    fn live_session() -> RelaySession {
        RelaySession {
            accounts: vec![EdgeCaseAddresses::ETH_VALID.to_string()],
            chain_id: 1,
            peer_name: None,
        }
    }

    #[tokio::test]
    async fn test_no_session_passive_check() {
        let f = fixture(MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1));
        let conn = f.adapter.connect(ConnectOptions::passive(Some(ChainId::ETHEREUM))).await.unwrap();
        assert!(conn.is_none());
        assert_eq!(f.client.create_calls(), 0);
        assert_eq!(f.client.kill_calls(), 0);
        assert_eq!(f.connector.bridges(), vec!["https://bridge.example.org".to_string()]);
    }

    #[tokio::test]
    async fn test_stale_session_is_killed() {
        let f = fixture(MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1).with_session(live_session()));
        let conn = f.adapter.connect(ConnectOptions::passive(None)).await.unwrap();
        assert!(conn.is_none());
        assert_eq!(f.client.kill_calls(), 1);
        assert!(!f.client.is_connected());
    }

    #[tokio::test]
    async fn test_existing_session_is_not_duplicated() {
        let f = fixture(MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1).with_session(live_session()));
        let conn = f.adapter.connect(ConnectOptions::interactive(Some(ChainId::ETHEREUM))).await.unwrap();
        assert!(conn.is_none());
        assert_eq!(f.client.create_calls(), 0);
        assert_eq!(f.client.kill_calls(), 0);
    }

    #[tokio::test]
    async fn test_pairing_success() {
        let mut f = fixture(MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 56));
        let conn = f
            .adapter
            .connect(ConnectOptions::interactive(Some(ChainId::new(56))))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(conn.address, EdgeCaseAddresses::ETH_VALID);
        assert_eq!(conn.chain_id, ChainId::new(56));
        match conn.provider {
            ActiveProvider::WalletConnect { rpc_url } => {
                assert_eq!(rpc_url, "https://bsc-dataseed.binance.org")
            }
            other => panic!("unexpected provider {other:?}"),
        }
        assert!(f.adapter.has_session());

        f.client.emit(RelayEvent::SessionUpdate(RelayPayload {
            accounts: vec![EdgeCaseAddresses::ETH_VALID_2.to_string()],
            chain_id: 137,
        }));
        assert_eq!(
            f.rx.recv().await,
            Some(WalletEvent::RelaySessionUpdate {
                accounts: vec![EdgeCaseAddresses::ETH_VALID_2.to_string()],
                chain_id: ChainId::new(137),
            })
        );

        f.client.emit(RelayEvent::Disconnect {
            message: Some("Session disconnected".into()),
        });
        assert_eq!(
            f.rx.recv().await,
            Some(WalletEvent::RelayDisconnected(DisconnectReason::ByWallet))
        );
    }

    #[tokio::test]
    async fn test_wrong_network_kills_session() {
        let f = fixture(MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1));
        let conn = f
            .adapter
            .connect(ConnectOptions::interactive(Some(ChainId::new(56))))
            .await
            .unwrap();

        assert!(conn.is_none());
        assert_eq!(f.client.create_calls(), 1);
        assert_eq!(f.client.kill_calls(), 1);
        assert!(!f.client.is_connected());
        assert_eq!(f.notifier.warnings(), vec![WRONG_NETWORK_WARNING.to_string()]);
        assert!(!f.adapter.has_session());
    }

    #[tokio::test]
    async fn test_rejected_pairing() {
        let mut f = fixture(MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1));
        f.client.set_outcome(PairingOutcome::Reject);

        let conn = f.adapter.connect(ConnectOptions::interactive(None)).await.unwrap();
        assert!(conn.is_none());
        assert_eq!(
            f.rx.recv().await,
            Some(WalletEvent::RelayDisconnected(DisconnectReason::Rejected))
        );
    }

    #[tokio::test]
    async fn test_create_session_failure_propagates() {
        let f = fixture(MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1));
        f.client.set_outcome(PairingOutcome::Fail(ProviderRpcError::new(-32000, "bridge offline")));
        let err = f.adapter.connect(ConnectOptions::interactive(None)).await.unwrap_err();
        assert_eq!(err.provider_code(), Some(-32000));

        f.client.set_outcome(PairingOutcome::Fail(ProviderRpcError::user_rejected()));
        assert!(f.adapter.connect(ConnectOptions::interactive(None)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_network_is_fatal() {
        let f = fixture(MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 424242));
        let err = f.adapter.connect(ConnectOptions::interactive(None)).await.unwrap_err();
        assert!(matches!(err, WalletsError::UnknownNetwork(424242)));
        assert_eq!(f.client.kill_calls(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_stops_forwarding() {
        let mut f = fixture(MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1));
        f.adapter.connect(ConnectOptions::interactive(None)).await.unwrap().unwrap();

        f.adapter.disconnect().await.unwrap();
        assert_eq!(f.client.kill_calls(), 1);
        assert!(!f.adapter.has_session());

        tokio::task::yield_now().await;
        assert!(f.rx.try_recv().is_err());

        // nothing held any more
        f.adapter.disconnect().await.unwrap();
        assert_eq!(f.client.kill_calls(), 1);
    }

    #[tokio::test]
    async fn test_send_and_change_network() {
        let f = fixture(MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1));
        let err = f
            .adapter
            .send_transaction(Some(ChainId::ETHEREUM), Transaction::Evm(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletsError::NotConnected));

        f.adapter.connect(ConnectOptions::interactive(None)).await.unwrap().unwrap();
        let tx = json!({"to": EdgeCaseAddresses::ETH_ZERO, "value": "0x0"});
        let hash = f
            .adapter
            .send_transaction(Some(ChainId::ETHEREUM), Transaction::Evm(tx.clone()))
            .await
            .unwrap();
        assert!(hash.is_some());
        assert_eq!(f.client.sent(), vec![tx]);

        assert!(!f.adapter.change_network(ChainId::new(56)).await.unwrap());
    }
}
