use crate::lock;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use web3_wallets_traits::{
    ProviderRpcError, RelayClient, RelayConnector, RelayEvent, RelayPayload, RelaySession,
};

/// What the simulated wallet does when a pairing starts
#[derive(Debug, Clone)]
pub enum PairingOutcome {
    /// The user scans the QR code and approves with this payload
    Approve(RelayPayload),
    /// The user scans and rejects ("Session Rejected")
    Reject,
    /// Nobody scans; the connect stays pending
    Pending,
    /// `create_session` itself fails
    Fail(ProviderRpcError),
}

/// In-memory WalletConnect v1 client.
///
/// Events are delivered synchronously from inside `create_session` and
/// `kill_session`, so a caller that subscribed first never misses them.
pub struct MockRelayClient {
    session: Mutex<Option<RelaySession>>,
    outcome: Mutex<PairingOutcome>,
    events: broadcast::Sender<RelayEvent>,
    create_calls: AtomicUsize,
    kill_calls: AtomicUsize,
    sent: Mutex<Vec<Value>>,
    send_error: Mutex<Option<ProviderRpcError>>,
}

impl MockRelayClient {
    /// A client with no session whose wallet approves on `chain_id`
    pub fn new(account: &str, chain_id: i64) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            session: Mutex::new(None),
            outcome: Mutex::new(PairingOutcome::Approve(RelayPayload {
                accounts: vec![account.to_string()],
                chain_id,
            })),
            events,
            create_calls: AtomicUsize::new(0),
            kill_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
        }
    }

    /// Starts with a live session, as if the SDK restored one from storage
    pub fn with_session(self, session: RelaySession) -> Self {
        *lock(&self.session) = Some(session);
        self
    }

    /// Sets what happens on the next pairing
    pub fn set_outcome(&self, outcome: PairingOutcome) {
        *lock(&self.outcome) = outcome;
    }

    /// Makes `send_transaction` fail
    pub fn fail_sends(&self, error: ProviderRpcError) {
        *lock(&self.send_error) = Some(error);
    }

    /// Broadcasts an event as the wallet would
    pub fn emit(&self, event: RelayEvent) {
        if matches!(event, RelayEvent::Disconnect { .. }) {
            lock(&self.session).take();
        }
        let _ = self.events.send(event);
    }

    /// `create_session` calls so far
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// `kill_session` calls so far
    pub fn kill_calls(&self) -> usize {
        self.kill_calls.load(Ordering::SeqCst)
    }

    /// Transactions passed to `send_transaction`
    pub fn sent(&self) -> Vec<Value> {
        lock(&self.sent).clone()
    }

    /// Live event subscribers
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl RelayClient for MockRelayClient {
    fn is_connected(&self) -> bool {
        lock(&self.session).is_some()
    }

    fn session(&self) -> Option<RelaySession> {
        lock(&self.session).clone()
    }

    async fn create_session(&self) -> Result<(), ProviderRpcError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = lock(&self.outcome).clone();
        match outcome {
            PairingOutcome::Approve(payload) => {
                *lock(&self.session) = Some(RelaySession {
                    accounts: payload.accounts.clone(),
                    chain_id: payload.chain_id,
                    peer_name: Some("Mock Wallet".to_string()),
                });
                let _ = self.events.send(RelayEvent::Connect(payload));
            }
            PairingOutcome::Reject => {
                let _ = self.events.send(RelayEvent::Disconnect {
                    message: Some("Session Rejected".to_string()),
                });
            }
            PairingOutcome::Pending => {}
            PairingOutcome::Fail(e) => return Err(e),
        }
        Ok(())
    }

    async fn kill_session(&self) -> Result<(), ProviderRpcError> {
        self.kill_calls.fetch_add(1, Ordering::SeqCst);
        if lock(&self.session).take().is_some() {
            let _ = self.events.send(RelayEvent::Disconnect {
                message: Some("Session Disconnected".to_string()),
            });
        }
        Ok(())
    }

    async fn send_transaction(&self, tx: Value) -> Result<Value, ProviderRpcError> {
        let count = {
            let mut sent = lock(&self.sent);
            sent.push(tx);
            sent.len()
        };
        if let Some(e) = lock(&self.send_error).clone() {
            return Err(e);
        }
        Ok(json!(format!("0x{count:064x}")))
    }

    fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }
}

/// Connector handing out one shared [`MockRelayClient`].
///
/// Each real connect builds a new SDK client that restores the persisted
/// session; sharing one mock reproduces that from the adapter's side.
pub struct MockRelayConnector {
    client: Arc<MockRelayClient>,
    bridges: Mutex<Vec<String>>,
}

impl MockRelayConnector {
    /// Wraps `client`
    pub fn new(client: Arc<MockRelayClient>) -> Self {
        Self {
            client,
            bridges: Mutex::new(Vec::new()),
        }
    }

    /// The shared client
    pub fn client(&self) -> Arc<MockRelayClient> {
        self.client.clone()
    }

    /// Bridge URLs passed to `connect`, one per call
    pub fn bridges(&self) -> Vec<String> {
        lock(&self.bridges).clone()
    }
}

impl RelayConnector for MockRelayConnector {
    fn connect(&self, bridge_url: &str) -> Arc<dyn RelayClient> {
        lock(&self.bridges).push(bridge_url.to_string());
        self.client.clone()
    }
}
