//! Confirmation Tracker
//!
//! Periodically sweeps every open ledger entry, recomputes its confirmation
//! depth from the current chain height, and advances its status:
//!
//! ```text
//! PENDING --(depth >= confirm_threshold)--> CONFIRMED
//! any open --(depth >= required_confirmations)--> FINAL
//! ```
//!
//! One sweep covers all entries; there are no per-entry timers. Because depth
//! is recomputable from `block_number` and the head alone, the first sweep
//! after a restart resumes tracking of every persisted open entry without any
//! event replay.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::eth_client::{ChainSource, EthClientError};
use crate::storage::{LedgerStore, StorageError};
use crate::types::ledger::EntryStatus;

/// Confirmation tracker errors
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("chain error: {0}")]
    Chain(#[from] EthClientError),
}

/// Counters for one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Open entries examined
    pub scanned: usize,
    /// Entries newly advanced to CONFIRMED
    pub confirmed: usize,
    /// Entries newly advanced to FINAL
    pub finalized: usize,
}

/// Periodic sweep advancing entry confirmation status
pub struct ConfirmationTracker {
    store: Arc<dyn LedgerStore>,
    chain: Arc<dyn ChainSource>,
    confirm_threshold: u64,
    required_confirmations: u64,
    sweep_interval: Duration,
}

impl ConfirmationTracker {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        chain: Arc<dyn ChainSource>,
        confirm_threshold: u64,
        required_confirmations: u64,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            store,
            chain,
            confirm_threshold,
            required_confirmations,
            sweep_interval,
        }
    }

    /// Spawn the sweep loop
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(self, cancel: CancellationToken) {
        // Restart recovery is just the first sweep; report what it resumed
        match self.store.list_open_entries().await {
            Ok(entries) => info!(
                open_entries = entries.len(),
                required_confirmations = self.required_confirmations,
                "confirmation tracker started"
            ),
            Err(e) => warn!(error = %e, "could not count open entries at startup"),
        }

        let mut ticker = interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("confirmation tracker stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        // Entries simply stay in their current status until
                        // the next successful sweep
                        warn!(error = %e, "confirmation sweep failed, entries remain pending");
                    }
                }
            }
        }
    }

    /// One sweep over all open entries
    pub async fn sweep_once(&self) -> Result<SweepSummary, TrackerError> {
        let entries = self.store.list_open_entries().await?;
        let mut summary = SweepSummary {
            scanned: entries.len(),
            ..Default::default()
        };

        if entries.is_empty() {
            return Ok(summary);
        }

        let height = self.chain.block_number().await?;

        for entry in entries {
            let confirmations = height.saturating_sub(entry.block_number);

            // FINAL wins over CONFIRMED, so a finality threshold below the
            // confirm threshold just skips the CONFIRMED stage
            let target = if confirmations >= self.required_confirmations {
                EntryStatus::Final
            } else if confirmations >= self.confirm_threshold {
                EntryStatus::Confirmed
            } else {
                EntryStatus::Pending
            };

            // Never push a status backwards (a height regression shows up
            // here as a lower computed depth)
            if !entry.status.can_advance_to(target) {
                continue;
            }

            if target == entry.status && confirmations == entry.metadata.confirmations {
                continue;
            }

            let finalized_at =
                (target == EntryStatus::Final).then(|| chrono::Utc::now().to_rfc3339());

            let applied = self
                .store
                .update_entry_status(&entry.id, target, confirmations, finalized_at)
                .await?;

            if applied && target != entry.status {
                info!(
                    entry_id = %entry.id,
                    tx_hash = %entry.tx_hash,
                    from_status = %entry.status,
                    to_status = %target,
                    confirmations,
                    "ledger entry advanced"
                );

                match target {
                    EntryStatus::Confirmed => summary.confirmed += 1,
                    EntryStatus::Final => summary.finalized += 1,
                    EntryStatus::Pending => {}
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eth_client::MockChainSource;
    use crate::storage::MemoryLedgerStore;
    use crate::types::ledger::LedgerEntry;

    fn tracker_at_height(
        store: Arc<MemoryLedgerStore>,
        height: u64,
        confirm_threshold: u64,
        required_confirmations: u64,
    ) -> ConfirmationTracker {
        let mut chain = MockChainSource::new();
        chain.expect_block_number().returning(move || Ok(height));

        ConfirmationTracker::new(
            store,
            Arc::new(chain),
            confirm_threshold,
            required_confirmations,
            Duration::from_secs(15),
        )
    }

    async fn pending_entry(store: &MemoryLedgerStore, tx_hash: &str, block_number: u64) -> String {
        let entry = LedgerEntry::credit(
            "w1",
            "USDT",
            "1000000",
            tx_hash,
            0,
            block_number,
            "0xsender",
        );
        store.create_entry_if_absent(&entry).await.unwrap();
        entry.id
    }

    #[tokio::test]
    async fn test_below_threshold_stays_pending() {
        let store = Arc::new(MemoryLedgerStore::new());
        pending_entry(&store, "0xT1", 100).await;

        let tracker = tracker_at_height(store.clone(), 103, 6, 12);
        let summary = tracker.sweep_once().await.unwrap();

        assert_eq!(summary, SweepSummary { scanned: 1, confirmed: 0, finalized: 0 });
        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.metadata.confirmations, 3);
    }

    #[tokio::test]
    async fn test_confirmed_at_six() {
        let store = Arc::new(MemoryLedgerStore::new());
        pending_entry(&store, "0xT1", 100).await;

        let tracker = tracker_at_height(store.clone(), 106, 6, 12);
        let summary = tracker.sweep_once().await.unwrap();

        assert_eq!(summary.confirmed, 1);
        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Confirmed);
        assert_eq!(entry.metadata.confirmations, 6);
        assert!(entry.metadata.finalized_at.is_none());
    }

    #[tokio::test]
    async fn test_final_at_required_confirmations() {
        let store = Arc::new(MemoryLedgerStore::new());
        let id = pending_entry(&store, "0xT1", 100).await;

        let tracker = tracker_at_height(store.clone(), 106, 6, 12);
        tracker.sweep_once().await.unwrap();

        let tracker = tracker_at_height(store.clone(), 112, 6, 12);
        let summary = tracker.sweep_once().await.unwrap();

        assert_eq!(summary.finalized, 1);
        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.status, EntryStatus::Final);
        assert_eq!(entry.metadata.confirmations, 12);
        assert!(entry.metadata.finalized_at.is_some());

        // FINAL entries drop out of tracking
        assert!(store.list_open_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_jumps_straight_to_final() {
        // Entry discovered late: depth already past both thresholds
        let store = Arc::new(MemoryLedgerStore::new());
        pending_entry(&store, "0xT1", 100).await;

        let tracker = tracker_at_height(store.clone(), 150, 6, 12);
        let summary = tracker.sweep_once().await.unwrap();

        assert_eq!(summary.confirmed, 0);
        assert_eq!(summary.finalized, 1);
        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Final);
    }

    #[tokio::test]
    async fn test_low_finality_threshold_skips_confirmed() {
        // required_confirmations below the confirm threshold: FINAL rule wins
        let store = Arc::new(MemoryLedgerStore::new());
        pending_entry(&store, "0xT1", 100).await;

        let tracker = tracker_at_height(store.clone(), 103, 6, 3);
        let summary = tracker.sweep_once().await.unwrap();

        assert_eq!(summary.finalized, 1);
        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Final);
    }

    #[tokio::test]
    async fn test_status_never_regresses_on_height_drop() {
        let store = Arc::new(MemoryLedgerStore::new());
        pending_entry(&store, "0xT1", 100).await;

        let tracker = tracker_at_height(store.clone(), 106, 6, 12);
        tracker.sweep_once().await.unwrap();

        // Provider briefly answers with a stale, lower head
        let tracker = tracker_at_height(store.clone(), 102, 6, 12);
        tracker.sweep_once().await.unwrap();

        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Confirmed);
        assert_eq!(entry.metadata.confirmations, 6);
    }

    #[tokio::test]
    async fn test_restart_recovery_resumes_from_store() {
        // Entries persisted by a previous process; no events replayed
        let store = Arc::new(MemoryLedgerStore::new());
        pending_entry(&store, "0xT1", 100).await;
        pending_entry(&store, "0xT2", 104).await;

        let tracker = tracker_at_height(store.clone(), 112, 6, 12);
        let summary = tracker.sweep_once().await.unwrap();

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.finalized, 1); // 0xT1 at depth 12
        assert_eq!(summary.confirmed, 1); // 0xT2 at depth 8

        let first = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        let second = store.get_entry("0xT2", 0).await.unwrap().unwrap();
        assert_eq!(first.status, EntryStatus::Final);
        assert_eq!(second.status, EntryStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_empty_sweep_skips_height_fetch() {
        let store = Arc::new(MemoryLedgerStore::new());

        // A mock with no expectations panics when called
        let chain = MockChainSource::new();
        let tracker = ConfirmationTracker::new(
            store,
            Arc::new(chain),
            6,
            12,
            Duration::from_secs(15),
        );

        let summary = tracker.sweep_once().await.unwrap();
        assert_eq!(summary.scanned, 0);
    }

    #[tokio::test]
    async fn test_chain_failure_surfaces_as_error() {
        let store = Arc::new(MemoryLedgerStore::new());
        pending_entry(&store, "0xT1", 100).await;

        let mut chain = MockChainSource::new();
        chain
            .expect_block_number()
            .returning(|| Err(EthClientError::MissingResult("eth_blockNumber".to_string())));

        let tracker = ConfirmationTracker::new(
            store.clone(),
            Arc::new(chain),
            6,
            12,
            Duration::from_secs(15),
        );

        assert!(tracker.sweep_once().await.is_err());
        // Entry untouched, still pending
        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Pending);
    }
}
