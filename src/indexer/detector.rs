//! Deposit Detector
//!
//! Single consumer of the watcher channel. Filters transfers by registry
//! membership and idempotently creates PENDING ledger entries; the store's
//! unique `(tx_hash, log_index)` key turns any redelivery into a no-op.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::WalletRegistry;
use crate::eth_client::TransferEvent;
use crate::storage::{CreateOutcome, LedgerStore, StorageResult};
use crate::types::ledger::LedgerEntry;

/// Serialized writer turning candidate transfers into ledger entries
pub struct DepositDetector {
    store: Arc<dyn LedgerStore>,
    registry: WalletRegistry,
    asset: String,
    rx: mpsc::Receiver<TransferEvent>,
}

impl DepositDetector {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        registry: WalletRegistry,
        asset: impl Into<String>,
        rx: mpsc::Receiver<TransferEvent>,
    ) -> Self {
        Self {
            store,
            registry,
            asset: asset.into(),
            rx,
        }
    }

    /// Spawn the consumer loop
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(mut self, cancel: CancellationToken) {
        info!(wallets = self.registry.len(), "deposit detector started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("deposit detector stopped");
                    break;
                }
                maybe_event = self.rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if let Err(e) = self.handle_transfer(&event).await {
                                // Not marked processed; the watcher's unmoved
                                // cursor redelivers and creation is idempotent
                                warn!(
                                    tx_hash = %event.tx_hash,
                                    log_index = event.log_index,
                                    error = %e,
                                    "failed to record deposit, awaiting redelivery"
                                );
                            }
                        }
                        None => break, // watcher gone
                    }
                }
            }
        }
    }

    /// Process one transfer notification
    pub async fn handle_transfer(&self, event: &TransferEvent) -> StorageResult<()> {
        let to = format!("{:#x}", event.to);

        let Some(wallet_id) = self.registry.wallet_id(&to) else {
            // Transfers between strangers are expected traffic, not errors
            debug!(to = %to, tx_hash = %event.tx_hash, "transfer to unmonitored address ignored");
            return Ok(());
        };

        let entry = LedgerEntry::credit(
            wallet_id,
            &self.asset,
            event.value.to_string(),
            &event.tx_hash,
            event.log_index,
            event.block_number,
            format!("{:#x}", event.from),
        );

        match self.store.create_entry_if_absent(&entry).await? {
            CreateOutcome::Created => {
                info!(
                    wallet_id,
                    amount = %entry.amount,
                    tx_hash = %event.tx_hash,
                    log_index = event.log_index,
                    block_number = event.block_number,
                    "deposit recorded as pending"
                );
            }
            CreateOutcome::Duplicate => {
                debug!(
                    tx_hash = %event.tx_hash,
                    log_index = event.log_index,
                    "transfer already recorded, skipping"
                );
            }
        }

        Ok(())
    }
}
