use super::{ConnectOptions, Transaction, WalletAdapter};
use crate::address::lookup_domain;
use crate::config::WalletsConfig;
use crate::lock;
use crate::session::{ActiveProvider, Connection};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use web3_wallets_error::{Result, WalletsError};
use web3_wallets_provider::{ConfirmationStatus, RpcClient, SolanaRpc};
use web3_wallets_traits::{
    ChainFamily, ChainId, NameService, SolanaCluster, SolanaProvider, TxHash, WalletName,
};

const CONFIRMATION_CHANNEL_CAPACITY: usize = 64;

/// Final status of a submitted Solana transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEvent {
    /// Submission signature
    pub signature: TxHash,
    /// Cluster it was sent to
    pub cluster: SolanaCluster,
    /// Outcome of the polling
    pub status: ConfirmationStatus,
    /// Explorer link for the signature
    pub explorer_url: String,
}

/// Phantom over an injected Solana provider
pub struct PhantomAdapter {
    provider: Option<Arc<dyn SolanaProvider>>,
    names: Arc<dyn NameService>,
    rpc: Arc<RpcClient>,
    config: WalletsConfig,
    confirmations: broadcast::Sender<ConfirmationEvent>,
    session: Mutex<CancellationToken>,
}

impl PhantomAdapter {
    pub(crate) fn new(
        provider: Option<Arc<dyn SolanaProvider>>,
        names: Arc<dyn NameService>,
        rpc: Arc<RpcClient>,
        config: WalletsConfig,
    ) -> Self {
        let (confirmations, _) = broadcast::channel(CONFIRMATION_CHANNEL_CAPACITY);
        Self {
            provider,
            names,
            rpc,
            config,
            confirmations,
            session: Mutex::new(CancellationToken::new()),
        }
    }

    fn phantom(&self) -> Option<&Arc<dyn SolanaProvider>> {
        self.provider.as_ref().filter(|p| p.is_phantom())
    }

    /// Receives the outcome of every transaction sent from now on
    pub fn subscribe_confirmations(&self) -> broadcast::Receiver<ConfirmationEvent> {
        self.confirmations.subscribe()
    }

    fn spawn_confirmation(&self, rpc: SolanaRpc, signature: String, cluster: SolanaCluster) {
        let cancel = lock(&self.session).child_token();
        let policy = self.config.confirmation.policy();
        let explorer_url = self.config.explorer_tx_url(&signature, cluster);
        let confirmations = self.confirmations.clone();

        tokio::spawn(async move {
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(%signature, "session ended, confirmation abandoned");
                    return;
                }
                status = rpc.confirm_transaction(&signature, &policy) => status,
            };

            match &status {
                ConfirmationStatus::Confirmed => {
                    tracing::info!(%signature, %cluster, explorer = %explorer_url, "transaction confirmed")
                }
                other => {
                    tracing::warn!(%signature, %cluster, explorer = %explorer_url, status = %other, "transaction not confirmed")
                }
            }

            // no subscribers is fine
            let _ = confirmations.send(ConfirmationEvent {
                signature: TxHash::new(signature),
                cluster,
                status,
                explorer_url,
            });
        });
    }
}

#[async_trait]
impl WalletAdapter for PhantomAdapter {
    fn name(&self) -> WalletName {
        WalletName::Phantom
    }

    fn is_available(&self) -> bool {
        self.phantom().is_some()
    }

    async fn connect(&self, options: ConnectOptions) -> Result<Option<Connection>> {
        let Some(provider) = self.phantom().cloned() else {
            return Ok(None);
        };
        let chain_id = options.chain_id.unwrap_or(ChainId::SOLANA_MAINNET);
        if chain_id.family() != Some(ChainFamily::Solana) {
            return Err(WalletsError::UnsupportedChain(chain_id.value()));
        }

        let address = match provider.connect(options.is_reconnect).await {
            Ok(address) => address,
            Err(e) if e.is_user_rejection() => {
                tracing::warn!(error = %e, trusted_only = options.is_reconnect, "user rejected the request");
                return Ok(None);
            }
            Err(e) => {
                tracing::error!(error = %e, "phantom connect failed");
                return Ok(None);
            }
        };
        tracing::info!(%address, %chain_id, "phantom connected");

        let domain = lookup_domain(self.names.as_ref(), &address).await;
        Ok(Some(Connection {
            address,
            chain_id,
            domain,
            provider: ActiveProvider::Phantom(provider),
        }))
    }

    async fn disconnect(&self) -> Result<()> {
        let previous = std::mem::replace(&mut *lock(&self.session), CancellationToken::new());
        previous.cancel();
        if let Some(provider) = &self.provider {
            provider.disconnect().await?;
        }
        Ok(())
    }

    async fn send_transaction(&self, chain_id: Option<ChainId>, tx: Transaction) -> Result<Option<TxHash>> {
        let chain_id = chain_id.ok_or(WalletsError::NotConnected)?;
        let cluster = SolanaCluster::from_chain_id(chain_id)?;
        let Transaction::Solana { mut tx, signers } = tx else {
            return Err(WalletsError::NotSupported(
                "Phantom sends Solana transactions only".into(),
            ));
        };
        let provider = self
            .phantom()
            .ok_or_else(|| WalletsError::ProviderUnavailable("Phantom".into()))?;
        let fee_payer = provider.public_key().ok_or(WalletsError::NotConnected)?;

        let rpc = SolanaRpc::new(self.rpc.clone(), self.config.solana_url(cluster));
        tx.set_fee_payer(fee_payer);

        if tx.recent_blockhash().is_none() {
            match rpc.latest_blockhash().await {
                Ok(blockhash) => tx.set_recent_blockhash(blockhash),
                Err(e) => {
                    tracing::warn!(%cluster, error = %e, "can't fetch recent blockhash");
                    return Ok(None);
                }
            }
        }

        if !signers.is_empty() {
            if let Err(e) = tx.partial_sign(&signers) {
                tracing::warn!(signers = signers.len(), error = %e, "co-signing failed");
                return Ok(None);
            }
        }

        let signed = match provider.sign_transaction(tx).await {
            Ok(signed) => signed,
            Err(e) => {
                tracing::warn!(error = %e, "wallet did not sign");
                return Ok(None);
            }
        };
        let raw = match signed.serialize() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "can't serialize signed transaction");
                return Ok(None);
            }
        };
        let signature = match rpc.send_raw_transaction(&raw).await {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!(%cluster, error = %e, "sendTransaction failed");
                return Ok(None);
            }
        };

        tracing::info!(%signature, %cluster, "transaction submitted");
        self.spawn_confirmation(rpc, signature.clone(), cluster);
        Ok(Some(TxHash::new(signature)))
    }

    async fn change_network(&self, chain_id: ChainId) -> Result<bool> {
        tracing::debug!(%chain_id, "phantom picks its cluster in the wallet");
        Ok(true)
    }
}
