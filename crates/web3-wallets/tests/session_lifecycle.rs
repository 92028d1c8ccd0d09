//! Session lifecycle tests for the wallet controller
//!
//! Tests cover:
//! - connect / disconnect for each wallet
//! - restore from the persisted choice
//! - wallet-originated events (chain and account changes, relay updates)
//! - switching between wallets
//! - network switching and sending

use serde_json::json;
use std::sync::Arc;
use web3_wallets::prelude::*;
use web3_wallets::WalletEvent;
use web3_wallets_testing::{
    EdgeCaseAddresses, FailingStore, MockEvmProvider, MockRelayClient, MockRelayConnector,
    MockSolanaProvider, PairingOutcome, RecordingNavigator, RecordingNotifier, StaticNameService,
};
use web3_wallets_traits::{
    DisconnectReason, EvmEvent, EvmEventKind, KeyValueStore, ProviderRpcError, RelayClient, RelayEvent,
    RelayPayload, RelaySession,
};

const PAGE: &str = "https://dapp.example.com/mint";
const SOL_KEY: &str = EdgeCaseAddresses::SOL_USDC_MINT;

struct Harness {
    ctl: WalletController,
    metamask: Arc<MockEvmProvider>,
    relay: Arc<MockRelayClient>,
    phantom: Arc<MockSolanaProvider>,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<RecordingNavigator>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new() -> Self {
        Self::with(
            MockEvmProvider::new(),
            MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1),
            MockSolanaProvider::new(SOL_KEY),
            Arc::new(MemoryStore::new()),
        )
    }

    fn with(
        metamask: MockEvmProvider,
        relay: MockRelayClient,
        phantom: MockSolanaProvider,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let metamask = Arc::new(metamask);
        let relay = Arc::new(relay);
        let phantom = Arc::new(phantom);
        let navigator = Arc::new(RecordingNavigator::new(PAGE));
        let notifier = Arc::new(RecordingNotifier::new());
        let ctl = WalletController::builder(WalletsConfig::default())
            .metamask(metamask.clone())
            .walletconnect(Arc::new(MockRelayConnector::new(relay.clone())))
            .phantom(phantom.clone())
            .store(store.clone())
            .navigator(navigator.clone())
            .notifier(notifier.clone())
            .evm_names(Arc::new(
                StaticNameService::new().with_name("vitalik.eth", EdgeCaseAddresses::ETH_VALID_2),
            ))
            .solana_names(Arc::new(StaticNameService::new().with_name("bonfida.sol", SOL_KEY)))
            .build()
            .unwrap();
        Self {
            ctl,
            metamask,
            relay,
            phantom,
            store,
            navigator,
            notifier,
        }
    }

    fn persisted(&self) -> Option<String> {
        self.store.get(web3_wallets::config::DEFAULT_STORAGE_KEY).unwrap()
    }

    fn persist(&self, name: &str) {
        self.store
            .set(web3_wallets::config::DEFAULT_STORAGE_KEY, name)
            .unwrap();
    }
}

// ============================================================================
// Connect
// ============================================================================

mod connect_tests {
    use super::*;

    #[tokio::test]
    async fn test_metamask_connect_populates_session() {
        let h = Harness::new();
        assert!(h.ctl.connect(WalletName::MetaMask, None).await.unwrap());

        let state = h.ctl.state();
        assert!(state.is_connected());
        assert_eq!(state.wallet_name, Some(WalletName::MetaMask));
        assert_eq!(state.chain_id, Some(ChainId::ETHEREUM));
        assert_eq!(state.address.as_deref(), Some(EdgeCaseAddresses::ETH_VALID));
        assert_eq!(state.address_short.as_deref(), Some("0x5aAe...eAed"));
        assert!(matches!(state.provider, Some(ActiveProvider::MetaMask(_))));
        assert!(!state.is_loading);
        assert_eq!(h.persisted().as_deref(), Some("MetaMask"));
    }

    #[tokio::test]
    async fn test_missing_metamask_redirects_without_touching_state() {
        let h = Harness::with(
            MockEvmProvider::new().not_metamask(),
            MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1),
            MockSolanaProvider::new(SOL_KEY),
            Arc::new(MemoryStore::new()),
        );
        let rx = h.ctl.subscribe();

        assert!(!h.ctl.connect(WalletName::MetaMask, Some(ChainId::ETHEREUM)).await.unwrap());

        assert!(h.ctl.state().is_empty());
        assert!(!rx.has_changed().unwrap());
        assert!(h.metamask.calls().is_empty());
        assert_eq!(h.navigator.opened(), vec![h.ctl.config().metamask_install_url.clone()]);
        assert!(h.persisted().is_none());
    }

    #[tokio::test]
    async fn test_missing_phantom_on_mobile_deep_links() {
        let navigator = Arc::new(RecordingNavigator::mobile(PAGE));
        let ctl = WalletController::builder(WalletsConfig::default())
            .phantom(Arc::new(MockSolanaProvider::new(SOL_KEY).not_phantom()))
            .navigator(navigator.clone())
            .evm_names(Arc::new(StaticNameService::new()))
            .solana_names(Arc::new(StaticNameService::new()))
            .build()
            .unwrap();

        assert!(!ctl.connect(WalletName::Phantom, None).await.unwrap());
        let redirects = navigator.redirects();
        assert_eq!(redirects.len(), 1);
        assert!(redirects[0].starts_with("https://phantom.app/ul/browse/https%3A%2F%2Fdapp.example.com"));
        assert!(ctl.state().is_empty());
    }

    #[tokio::test]
    async fn test_user_rejection_is_false() {
        let h = Harness::new();
        h.metamask
            .push_response("eth_requestAccounts", Err(ProviderRpcError::user_rejected()));

        assert!(!h.ctl.connect(WalletName::MetaMask, None).await.unwrap());
        let state = h.ctl.state();
        assert!(state.is_empty());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_missing_network_params_is_an_error() {
        let h = Harness::new();
        let err = h
            .ctl
            .connect(WalletName::MetaMask, Some(ChainId::new(777_777)))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletsError::UnknownNetwork(777_777)));
        assert!(!h.ctl.state().is_loading);
    }

    #[tokio::test]
    async fn test_walletconnect_pairing() {
        let h = Harness::with(
            MockEvmProvider::new(),
            MockRelayClient::new(EdgeCaseAddresses::ETH_VALID_2, 56),
            MockSolanaProvider::new(SOL_KEY),
            Arc::new(MemoryStore::new()),
        );
        assert!(h.ctl.connect(WalletName::WalletConnect, Some(ChainId::new(56))).await.unwrap());

        let state = h.ctl.state();
        assert_eq!(state.wallet_name, Some(WalletName::WalletConnect));
        assert_eq!(state.chain_id, Some(ChainId::new(56)));
        assert_eq!(state.address_domain.as_deref(), Some("vitalik.eth"));
        assert_eq!(h.relay.create_calls(), 1);
        assert_eq!(h.persisted().as_deref(), Some("WalletConnect"));
    }

    #[tokio::test]
    async fn test_walletconnect_wrong_network() {
        let h = Harness::new();
        assert!(!h.ctl.connect(WalletName::WalletConnect, Some(ChainId::new(56))).await.unwrap());

        assert_eq!(h.relay.kill_calls(), 1);
        assert!(!h.relay.is_connected());
        assert_eq!(
            h.notifier.warnings(),
            vec![web3_wallets::adapters::WRONG_NETWORK_WARNING.to_string()]
        );
        assert!(h.ctl.state().is_empty());
        assert!(h.persisted().is_none());
    }

    #[tokio::test]
    async fn test_walletconnect_rejection_resolves_false() {
        let h = Harness::new();
        h.relay.set_outcome(PairingOutcome::Reject);

        assert!(!h.ctl.connect(WalletName::WalletConnect, None).await.unwrap());
        assert_eq!(h.ctl.process_pending_events().await, 1);
        assert!(h.ctl.state().is_empty());
    }

    #[tokio::test]
    async fn test_phantom_connect() {
        let h = Harness::new();
        assert!(h.ctl.connect(WalletName::Phantom, Some(ChainId::SOLANA_TESTNET)).await.unwrap());

        let state = h.ctl.state();
        assert_eq!(state.chain_id, Some(ChainId::SOLANA_TESTNET));
        assert_eq!(state.address_short.as_deref(), Some("EPjF...Dt1v"));
        assert_eq!(state.address_domain.as_deref(), Some("bonfida.sol"));
        assert_eq!(h.phantom.connect_calls(), vec![false]);
    }

    #[tokio::test]
    async fn test_phantom_rejects_evm_chain() {
        let h = Harness::new();
        let err = h.ctl.connect(WalletName::Phantom, Some(ChainId::new(56))).await.unwrap_err();
        assert!(matches!(err, WalletsError::UnsupportedChain(56)));
        assert!(h.ctl.state().is_empty());
    }
}

// ============================================================================
// Switching wallets
// ============================================================================

mod switching_tests {
    use super::*;

    #[tokio::test]
    async fn test_connecting_another_wallet_tears_down_previous() {
        let h = Harness::new();
        h.ctl.connect(WalletName::MetaMask, None).await.unwrap();
        assert_eq!(h.metamask.listener_count(EvmEventKind::ChainChanged), 1);

        assert!(h.ctl.connect(WalletName::Phantom, None).await.unwrap());
        assert_eq!(h.metamask.listener_count(EvmEventKind::ChainChanged), 0);
        assert_eq!(h.metamask.listener_count(EvmEventKind::AccountsChanged), 0);

        let state = h.ctl.state();
        assert_eq!(state.wallet_name, Some(WalletName::Phantom));
        assert!(matches!(state.provider, Some(ActiveProvider::Phantom(_))));
        assert_eq!(h.persisted().as_deref(), Some("Phantom"));
    }

    #[tokio::test]
    async fn test_injected_connect_kills_relay_session() {
        let h = Harness::new();
        assert!(h.ctl.connect(WalletName::WalletConnect, Some(ChainId::ETHEREUM)).await.unwrap());
        assert!(h.relay.is_connected());

        assert!(h.ctl.connect(WalletName::MetaMask, None).await.unwrap());
        assert!(!h.relay.is_connected());
        assert_eq!(h.relay.kill_calls(), 1);

        tokio::task::yield_now().await;
        h.ctl.process_pending_events().await;
        let state = h.ctl.state();
        assert_eq!(state.wallet_name, Some(WalletName::MetaMask));
        assert!(state.is_connected());
    }

    #[tokio::test]
    async fn test_rejected_injected_connect_keeps_relay_session() {
        let h = Harness::new();
        assert!(h.ctl.connect(WalletName::WalletConnect, Some(ChainId::ETHEREUM)).await.unwrap());
        h.metamask
            .push_response("eth_requestAccounts", Err(ProviderRpcError::user_rejected()));

        assert!(!h.ctl.connect(WalletName::MetaMask, None).await.unwrap());
        assert!(h.relay.is_connected());
        assert_eq!(h.relay.kill_calls(), 0);

        tokio::task::yield_now().await;
        h.ctl.process_pending_events().await;
        let state = h.ctl.state();
        assert_eq!(state.wallet_name, Some(WalletName::WalletConnect));
        assert!(state.is_connected());
        assert_eq!(h.persisted().as_deref(), Some("WalletConnect"));
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_current_wallet() {
        let h = Harness::new();
        h.ctl.connect(WalletName::MetaMask, None).await.unwrap();
        h.phantom.fail_connect(ProviderRpcError::user_rejected());

        assert!(!h.ctl.connect(WalletName::Phantom, None).await.unwrap());
        assert_eq!(h.ctl.state().wallet_name, Some(WalletName::MetaMask));
        assert!(h.ctl.metamask().is_subscribed());
    }
}

// ============================================================================
// Disconnect
// ============================================================================

mod disconnect_tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnect_resets_every_wallet() {
        for (wallet, chain) in [
            (WalletName::MetaMask, None),
            (WalletName::WalletConnect, Some(ChainId::ETHEREUM)),
            (WalletName::Phantom, None),
        ] {
            let h = Harness::new();
            assert!(h.ctl.connect(wallet, chain).await.unwrap(), "{wallet} connect");
            assert!(h.persisted().is_some());

            h.ctl.disconnect().await;
            let state = h.ctl.state();
            assert!(state.is_empty(), "{wallet} state not reset");
            assert!(!state.is_connected());
            assert!(h.persisted().is_none(), "{wallet} choice not erased");
        }
    }

    #[tokio::test]
    async fn test_disconnect_tears_down_transports() {
        let h = Harness::new();
        h.ctl.connect(WalletName::Phantom, None).await.unwrap();
        h.ctl.disconnect().await;
        assert_eq!(h.phantom.disconnect_calls(), 1);

        h.ctl.connect(WalletName::WalletConnect, None).await.unwrap();
        h.ctl.disconnect().await;
        assert!(!h.relay.is_connected());
        assert!(!h.ctl.walletconnect().has_session());

        h.ctl.connect(WalletName::MetaMask, None).await.unwrap();
        h.ctl.disconnect().await;
        assert!(!h.ctl.metamask().is_subscribed());
    }

    #[tokio::test]
    async fn test_disconnect_with_failing_store() {
        let h = Harness::with(
            MockEvmProvider::new(),
            MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1),
            MockSolanaProvider::new(SOL_KEY),
            Arc::new(FailingStore),
        );
        assert!(h.ctl.connect(WalletName::MetaMask, None).await.unwrap());
        h.ctl.disconnect().await;
        assert!(h.ctl.state().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_when_idle() {
        let h = Harness::new();
        h.persist("MetaMask");
        h.ctl.disconnect().await;
        assert!(h.ctl.state().is_empty());
        assert!(h.persisted().is_none());
    }
}

// ============================================================================
// Restore
// ============================================================================

mod restore_tests {
    use super::*;

    #[tokio::test]
    async fn test_nothing_persisted() {
        let h = Harness::new();
        assert!(!h.ctl.restore().await.unwrap());
        assert_eq!(h.relay.create_calls(), 0);
        assert!(!h.ctl.state().is_loading);
    }

    #[tokio::test]
    async fn test_unlocked_metamask() {
        let h = Harness::new();
        h.persist("MetaMask");
        assert!(h.ctl.restore().await.unwrap());
        assert_eq!(h.ctl.state().wallet_name, Some(WalletName::MetaMask));
        assert!(h.ctl.metamask().is_subscribed());
    }

    #[tokio::test]
    async fn test_locked_metamask() {
        let h = Harness::with(
            MockEvmProvider::new().with_unlocked(false),
            MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1),
            MockSolanaProvider::new(SOL_KEY),
            Arc::new(MemoryStore::new()),
        );
        h.persist("MetaMask");
        assert!(!h.ctl.restore().await.unwrap());
        assert!(h.metamask.calls_to("eth_requestAccounts").is_empty());
        assert!(h.ctl.state().is_empty());
    }

    #[tokio::test]
    async fn test_trusted_phantom() {
        let h = Harness::new();
        h.persist("Phantom");
        assert!(h.ctl.restore().await.unwrap());
        assert_eq!(h.phantom.connect_calls(), vec![true]);
        assert_eq!(h.ctl.state().chain_id, Some(ChainId::SOLANA_MAINNET));
    }

    #[tokio::test]
    async fn test_untrusted_phantom() {
        let h = Harness::with(
            MockEvmProvider::new(),
            MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1),
            MockSolanaProvider::new(SOL_KEY).untrusted(),
            Arc::new(MemoryStore::new()),
        );
        h.persist("Phantom");
        assert!(!h.ctl.restore().await.unwrap());
        assert!(h.ctl.state().is_empty());
    }

    #[tokio::test]
    async fn test_walletconnect_and_unknown_names_are_not_restored() {
        for stored in ["WalletConnect", "Coinbase", ""] {
            let h = Harness::new();
            h.persist(stored);
            assert!(!h.ctl.restore().await.unwrap(), "{stored:?} restored");
            assert_eq!(h.relay.create_calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_stale_relay_session_is_killed() {
        let h = Harness::with(
            MockEvmProvider::new(),
            MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1).with_session(RelaySession {
                accounts: vec![EdgeCaseAddresses::ETH_VALID.into()],
                chain_id: 1,
                peer_name: None,
            }),
            MockSolanaProvider::new(SOL_KEY),
            Arc::new(MemoryStore::new()),
        );
        assert!(!h.ctl.restore().await.unwrap());
        assert_eq!(h.relay.kill_calls(), 1);
        assert_eq!(h.relay.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let h = Harness::with(
            MockEvmProvider::new(),
            MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1),
            MockSolanaProvider::new(SOL_KEY),
            Arc::new(FailingStore),
        );
        assert!(!h.ctl.restore().await.unwrap());
    }

    #[tokio::test]
    async fn test_choice_survives_restart_in_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");

        let first = Harness::with(
            MockEvmProvider::new(),
            MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1),
            MockSolanaProvider::new(SOL_KEY),
            Arc::new(JsonFileStore::new(&path)),
        );
        assert!(first.ctl.connect(WalletName::Phantom, None).await.unwrap());

        let second = Harness::with(
            MockEvmProvider::new(),
            MockRelayClient::new(EdgeCaseAddresses::ETH_VALID, 1),
            MockSolanaProvider::new(SOL_KEY),
            Arc::new(JsonFileStore::new(&path)),
        );
        assert!(second.ctl.restore().await.unwrap());
        assert_eq!(second.ctl.state().wallet_name, Some(WalletName::Phantom));
    }
}

// ============================================================================
// Wallet events
// ============================================================================

mod event_tests {
    use super::*;

    #[tokio::test]
    async fn test_listeners_registered_once_across_connects() {
        let h = Harness::new();
        for _ in 0..3 {
            assert!(h.ctl.connect(WalletName::MetaMask, None).await.unwrap());
        }
        assert_eq!(h.metamask.listener_count(EvmEventKind::ChainChanged), 1);
        assert_eq!(h.metamask.listener_count(EvmEventKind::AccountsChanged), 1);

        h.metamask.emit(EvmEvent::ChainChanged("0x38".into()));
        assert_eq!(h.ctl.process_pending_events().await, 1);
        assert_eq!(h.ctl.state().chain_id, Some(ChainId::new(56)));
    }

    #[tokio::test]
    async fn test_accounts_changed() {
        let h = Harness::new();
        h.ctl.connect(WalletName::MetaMask, None).await.unwrap();

        h.metamask.emit(EvmEvent::AccountsChanged(vec![EdgeCaseAddresses::ETH_VALID_2.into()]));
        assert_eq!(h.ctl.process_pending_events().await, 1);
        let state = h.ctl.state();
        assert_eq!(state.address.as_deref(), Some(EdgeCaseAddresses::ETH_VALID_2));
        assert_eq!(state.address_short.as_deref(), Some("0xfB69...d359"));
        assert_eq!(state.address_domain.as_deref(), Some("vitalik.eth"));
    }

    #[tokio::test]
    async fn test_empty_accounts_disconnects() {
        let h = Harness::new();
        h.ctl.connect(WalletName::MetaMask, None).await.unwrap();

        h.metamask.emit(EvmEvent::AccountsChanged(vec![]));
        assert_eq!(h.ctl.process_pending_events().await, 1);
        assert!(h.ctl.state().is_empty());
        assert!(h.persisted().is_none());
        assert!(!h.ctl.metamask().is_subscribed());
    }

    #[tokio::test]
    async fn test_relay_session_update_and_disconnect() {
        let h = Harness::new();
        h.ctl.connect(WalletName::WalletConnect, Some(ChainId::ETHEREUM)).await.unwrap();

        h.relay.emit(RelayEvent::SessionUpdate(RelayPayload {
            accounts: vec![EdgeCaseAddresses::ETH_VALID.into()],
            chain_id: 137,
        }));
        assert!(h.ctl.process_next_event().await);
        let state = h.ctl.state();
        assert_eq!(state.chain_id, Some(ChainId::new(137)));
        assert!(state.is_connected());

        h.relay.emit(RelayEvent::Disconnect {
            message: Some("Session disconnected".into()),
        });
        assert!(h.ctl.process_next_event().await);
        assert!(h.ctl.state().is_empty());
        assert!(h.persisted().is_none());
    }

    #[tokio::test]
    async fn test_stale_relay_disconnect_is_ignored() {
        let h = Harness::new();
        h.ctl.connect(WalletName::Phantom, None).await.unwrap();
        h.ctl
            .handle_event(WalletEvent::RelayDisconnected(DisconnectReason::ByDapp))
            .await;
        assert_eq!(h.ctl.state().wallet_name, Some(WalletName::Phantom));
    }
}

// ============================================================================
// Network switching and sending
// ============================================================================

mod operation_tests {
    use super::*;

    #[tokio::test]
    async fn test_change_network_metamask() {
        let h = Harness::new();
        h.ctl.connect(WalletName::MetaMask, None).await.unwrap();

        assert!(h.ctl.change_network(WalletName::MetaMask, ChainId::new(137)).await.unwrap());
        assert_eq!(h.ctl.state().chain_id, Some(ChainId::new(137)));

        h.metamask
            .push_response("wallet_switchEthereumChain", Err(ProviderRpcError::user_rejected()));
        assert!(!h.ctl.change_network(WalletName::MetaMask, ChainId::new(56)).await.unwrap());
        assert_eq!(h.ctl.state().chain_id, Some(ChainId::new(137)));

        let err = h
            .ctl
            .change_network(WalletName::MetaMask, ChainId::new(999_999))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletsError::UnknownNetwork(999_999)));
    }

    #[tokio::test]
    async fn test_change_network_other_wallets() {
        let h = Harness::new();
        assert!(!h
            .ctl
            .change_network(WalletName::WalletConnect, ChainId::new(56))
            .await
            .unwrap());
        assert!(h
            .ctl
            .change_network(WalletName::Phantom, ChainId::SOLANA_TESTNET)
            .await
            .unwrap());
        assert!(h.ctl.state().chain_id.is_none());
    }

    #[tokio::test]
    async fn test_send_tx_requires_wallet() {
        let h = Harness::new();
        let err = h.ctl.send_tx(Transaction::Evm(json!({}))).await.unwrap_err();
        assert!(matches!(err, WalletsError::NotConnected));
    }

    #[tokio::test]
    async fn test_send_tx_metamask() {
        let h = Harness::new();
        h.ctl.connect(WalletName::MetaMask, None).await.unwrap();
        let tx = json!({
            "from": EdgeCaseAddresses::ETH_VALID,
            "to": EdgeCaseAddresses::ETH_VALID_2,
            "value": "0xde0b6b3a7640000"
        });

        let hash = h.ctl.send_tx(Transaction::Evm(tx.clone())).await.unwrap();
        assert!(hash.is_some());
        assert_eq!(h.metamask.calls_to("eth_sendTransaction"), vec![json!([tx])]);
    }

    #[tokio::test]
    async fn test_send_tx_walletconnect() {
        let h = Harness::new();
        h.ctl.connect(WalletName::WalletConnect, None).await.unwrap();
        let tx = json!({"from": EdgeCaseAddresses::ETH_VALID, "data": "0x"});

        assert!(h.ctl.send_tx(Transaction::Evm(tx.clone())).await.unwrap().is_some());
        assert_eq!(h.relay.sent(), vec![tx]);
    }
}
