//! Transfer Watcher
//!
//! Polls the chain for new Transfer logs on the watched token contract and
//! emits each decoded event onto a bounded channel. One watcher covers all
//! monitored wallets.
//!
//! Delivery is at-least-once: the block cursor only advances after every log
//! in the range has been handed to the channel, so an RPC failure or crash
//! mid-range causes redelivery, never loss. The detector's idempotent writes
//! absorb the duplicates.

use std::sync::Arc;

use alloy_primitives::Address;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::eth_client::{ChainSource, EthClientError, TransferEvent};

/// Polling watcher for ERC-20 transfer logs
pub struct TransferWatcher {
    chain: Arc<dyn ChainSource>,
    token: Address,
    poll_interval: Duration,
    tx: mpsc::Sender<TransferEvent>,
    /// Last block whose logs were fully delivered
    cursor: Option<u64>,
}

impl TransferWatcher {
    pub fn new(
        chain: Arc<dyn ChainSource>,
        token: Address,
        poll_interval: Duration,
        tx: mpsc::Sender<TransferEvent>,
    ) -> Self {
        Self {
            chain,
            token,
            poll_interval,
            tx,
            cursor: None,
        }
    }

    /// Spawn the polling loop; cancelling the token is unsubscribe
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(token = %self.token, "transfer watcher started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("transfer watcher stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(true) => {}
                        Ok(false) => break, // channel closed, consumer gone
                        Err(e) => {
                            // Connectivity loss is not fatal; the cursor stays
                            // put and the next tick retries the same range.
                            warn!(error = %e, "transfer poll failed, will retry");
                        }
                    }
                }
            }
        }
    }

    /// One polling pass. Returns false once the channel is closed.
    pub async fn poll_once(&mut self) -> Result<bool, EthClientError> {
        let head = self.chain.block_number().await?;

        let from_block = match self.cursor {
            // First poll: start watching from the current head
            None => {
                self.cursor = Some(head);
                debug!(head, "watcher cursor initialized");
                return Ok(true);
            }
            Some(cursor) if cursor >= head => return Ok(true),
            Some(cursor) => cursor + 1,
        };

        let events = self
            .chain
            .transfer_logs(self.token, from_block, head)
            .await?;

        if !events.is_empty() {
            debug!(
                from_block,
                to_block = head,
                count = events.len(),
                "transfer logs fetched"
            );
        }

        for event in events {
            // A full channel applies backpressure here rather than dropping
            if self.tx.send(event).await.is_err() {
                return Ok(false);
            }
        }

        self.cursor = Some(head);
        Ok(true)
    }
}
