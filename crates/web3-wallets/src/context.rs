//! UI-facing context.
//!
//! A [`WalletContext`] is what a UI layer mounts once: it starts the event
//! loop, restores the previous session and exposes the session together with
//! the operations and address helpers.

use crate::adapters::{ConfirmationEvent, Transaction};
use crate::address;
use crate::controller::WalletController;
use crate::session::Session;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use web3_wallets_error::Result;
use web3_wallets_traits::{ChainId, TxHash, WalletName};

/// Mounted wallet context
pub struct WalletContext {
    controller: WalletController,
    cancel: CancellationToken,
    events_task: Option<JoinHandle<()>>,
}

impl WalletContext {
    /// Starts applying wallet events and restores the persisted session.
    ///
    /// A failed restore is logged and leaves the session empty.
    pub async fn mount(controller: WalletController) -> Self {
        let cancel = CancellationToken::new();
        let runner = controller.clone();
        let token = cancel.clone();
        let events_task = tokio::spawn(async move { runner.run_events(token).await });

        match controller.restore().await {
            Ok(true) => tracing::info!("previous session restored"),
            Ok(false) => tracing::debug!("nothing to restore"),
            Err(e) => tracing::warn!(error = %e, "restore failed"),
        }

        Self {
            controller,
            cancel,
            events_task: Some(events_task),
        }
    }

    /// Underlying controller
    pub fn controller(&self) -> &WalletController {
        &self.controller
    }

    /// Current session
    pub fn state(&self) -> Session {
        self.controller.state()
    }

    /// Session change notifications
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.controller.subscribe()
    }

    /// Solana confirmation outcomes
    pub fn subscribe_confirmations(&self) -> broadcast::Receiver<ConfirmationEvent> {
        self.controller.subscribe_confirmations()
    }

    /// See [`WalletController::restore`]
    pub async fn restore(&self) -> Result<bool> {
        self.controller.restore().await
    }

    /// See [`WalletController::connect`]
    pub async fn connect(&self, name: WalletName, chain_id: Option<ChainId>) -> Result<bool> {
        self.controller.connect(name, chain_id).await
    }

    /// See [`WalletController::change_network`]
    pub async fn change_network(&self, name: WalletName, chain_id: ChainId) -> Result<bool> {
        self.controller.change_network(name, chain_id).await
    }

    /// See [`WalletController::send_tx`]
    pub async fn send_tx(&self, tx: Transaction) -> Result<Option<TxHash>> {
        self.controller.send_tx(tx).await
    }

    /// See [`WalletController::disconnect`]
    pub async fn disconnect(&self) {
        self.controller.disconnect().await
    }

    /// [`address::is_valid_address`] with the context's name services
    pub async fn is_valid_address(&self, chain_id: ChainId, address: &str) -> Result<bool> {
        address::is_valid_address(self.controller.resolvers(), chain_id, address).await
    }

    /// [`address::parse_address_from_domain`] with the context's name services
    pub async fn parse_address_from_domain(&self, input: &str) -> Result<Option<String>> {
        address::parse_address_from_domain(self.controller.resolvers(), input).await
    }

    /// Stops the event loop and waits for it to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.events_task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "event loop task failed");
            }
        }
    }
}

impl Drop for WalletContext {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
