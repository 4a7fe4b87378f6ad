//! Deposit Monitor Service
//!
//! Lifecycle controller for the indexing pipeline. Owns the watcher, detector,
//! and tracker tasks plus their cancellation token in a single state value, so
//! `start`/`stop` are guarded transitions rather than global mutation. Both
//! are idempotent: starting while running and stopping while stopped are
//! observable no-ops.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::detector::DepositDetector;
use super::registry::WalletRegistry;
use super::tracker::ConfirmationTracker;
use super::watcher::TransferWatcher;
use crate::balance::{self, BalanceError};
use crate::config::IndexerConfig;
use crate::eth_client::ChainSource;
use crate::storage::{LedgerStore, StorageError};

/// Monitor lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("balance error: {0}")]
    Balance(#[from] BalanceError),
}

/// Result of a start request
#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// Monitoring began for this many wallets
    Started { wallets: usize },
    /// Already running; no side effects
    AlreadyRunning,
    /// No wallets registered; nothing to monitor (not an error)
    NoWallets,
}

/// Result of a stop request
#[derive(Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

/// Snapshot of monitor state for the upward control surface
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub required_confirmations: u64,
}

/// Everything owned by a live monitoring session
struct RunningMonitor {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Deposit monitor: the one controller per process
pub struct DepositMonitor {
    config: IndexerConfig,
    store: Arc<dyn LedgerStore>,
    chain: Arc<dyn ChainSource>,
    state: Mutex<Option<RunningMonitor>>,
}

impl DepositMonitor {
    pub fn new(
        config: IndexerConfig,
        store: Arc<dyn LedgerStore>,
        chain: Arc<dyn ChainSource>,
    ) -> Self {
        Self {
            config,
            store,
            chain,
            state: Mutex::new(None),
        }
    }

    /// Start monitoring. Idempotent: a second call reports `AlreadyRunning`
    /// without touching the live session.
    pub async fn start(&self) -> Result<StartOutcome, MonitorError> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Ok(StartOutcome::AlreadyRunning);
        }

        // Fresh registry snapshot for this session
        let registry = WalletRegistry::load(self.store.as_ref()).await?;
        if registry.is_empty() {
            info!("no wallets registered, nothing to monitor");
            return Ok(StartOutcome::NoWallets);
        }
        let wallets = registry.len();

        let cancel = CancellationToken::new();
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_capacity);

        let watcher = TransferWatcher::new(
            self.chain.clone(),
            self.config.token_address,
            Duration::from_secs(self.config.poll_interval_secs),
            event_tx,
        );
        let detector = DepositDetector::new(
            self.store.clone(),
            registry,
            self.config.asset.clone(),
            event_rx,
        );
        let tracker = ConfirmationTracker::new(
            self.store.clone(),
            self.chain.clone(),
            self.config.confirm_threshold,
            self.config.required_confirmations,
            Duration::from_secs(self.config.sweep_interval_secs),
        );

        let tasks = vec![
            watcher.spawn(cancel.child_token()),
            detector.spawn(cancel.child_token()),
            tracker.spawn(cancel.child_token()),
        ];

        *state = Some(RunningMonitor { cancel, tasks });

        info!(
            wallets,
            token = %self.config.token_address,
            required_confirmations = self.config.required_confirmations,
            "deposit monitoring started"
        );

        Ok(StartOutcome::Started { wallets })
    }

    /// Stop monitoring. Idempotent: stopping a stopped monitor reports
    /// `NotRunning`.
    pub async fn stop(&self) -> StopOutcome {
        let mut state = self.state.lock().await;

        match state.take() {
            None => StopOutcome::NotRunning,
            Some(running) => {
                running.cancel.cancel();
                for task in running.tasks {
                    if let Err(e) = task.await {
                        warn!(error = %e, "monitor task ended abnormally");
                    }
                }
                info!("deposit monitoring stopped");
                StopOutcome::Stopped
            }
        }
    }

    /// Current monitor status
    pub async fn status(&self) -> MonitorStatus {
        MonitorStatus {
            running: self.state.lock().await.is_some(),
            required_confirmations: self.config.required_confirmations,
        }
    }

    /// Signed wallet balance over FINAL entries, as a decimal string
    pub async fn get_balance(&self, wallet_id: &str) -> Result<String, MonitorError> {
        let balance = balance::wallet_balance(self.store.as_ref(), wallet_id).await?;
        Ok(balance.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eth_client::{MockChainSource, TransferEvent};
    use crate::storage::MemoryLedgerStore;
    use crate::types::ledger::EntryStatus;
    use crate::types::wallet::MonitoredWallet;
    use alloy_primitives::{Address, U256};
    use std::str::FromStr;

    const MONITORED: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn test_config() -> IndexerConfig {
        IndexerConfig {
            rpc_url: "http://localhost:8545".to_string(),
            token_address: Address::repeat_byte(0x11),
            asset: "USDT".to_string(),
            required_confirmations: 12,
            confirm_threshold: 6,
            poll_interval_secs: 15,
            sweep_interval_secs: 15,
            channel_capacity: 8,
            db_path: ":memory:".to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }

    fn idle_chain() -> Arc<MockChainSource> {
        let mut chain = MockChainSource::new();
        chain.expect_block_number().returning(|| Ok(100));
        chain.expect_transfer_logs().returning(|_, _, _| Ok(vec![]));
        Arc::new(chain)
    }

    #[tokio::test]
    async fn test_start_without_wallets_is_a_noop() {
        let store = Arc::new(MemoryLedgerStore::new());
        let monitor = DepositMonitor::new(test_config(), store, idle_chain());

        assert_eq!(monitor.start().await.unwrap(), StartOutcome::NoWallets);
        assert!(!monitor.status().await.running);
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let store = Arc::new(MemoryLedgerStore::new());
        store
            .insert_wallet(&MonitoredWallet::new("w1", MONITORED))
            .await
            .unwrap();

        let monitor = DepositMonitor::new(test_config(), store, idle_chain());

        assert_eq!(
            monitor.start().await.unwrap(),
            StartOutcome::Started { wallets: 1 }
        );
        assert!(monitor.status().await.running);

        // Second start leaves the session alone
        assert_eq!(monitor.start().await.unwrap(), StartOutcome::AlreadyRunning);

        assert_eq!(monitor.stop().await, StopOutcome::Stopped);
        assert!(!monitor.status().await.running);
        assert_eq!(monitor.stop().await, StopOutcome::NotRunning);

        // Restartable after stop
        assert_eq!(
            monitor.start().await.unwrap(),
            StartOutcome::Started { wallets: 1 }
        );
        assert_eq!(monitor.stop().await, StopOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_status_reports_configuration() {
        let store = Arc::new(MemoryLedgerStore::new());
        let monitor = DepositMonitor::new(test_config(), store, idle_chain());

        let status = monitor.status().await;
        assert!(!status.running);
        assert_eq!(status.required_confirmations, 12);
    }

    /// The full lifecycle from the original acceptance scenario: detection at
    /// block 100, CONFIRMED at height 106, FINAL at height 112, and a
    /// redelivery after finality changing nothing.
    #[tokio::test]
    async fn test_deposit_lifecycle_end_to_end() {
        let store = Arc::new(MemoryLedgerStore::new());
        store
            .insert_wallet(&MonitoredWallet::new("w1", MONITORED))
            .await
            .unwrap();

        let registry = WalletRegistry::load(store.as_ref()).await.unwrap();
        let (_tx, rx) = mpsc::channel(8);
        let detector = DepositDetector::new(store.clone(), registry, "USDT", rx);

        let event = TransferEvent {
            from: Address::repeat_byte(0xaa),
            to: Address::from_str(MONITORED).unwrap(),
            value: U256::from(1_000_000u64),
            tx_hash: "0xT1".to_string(),
            log_index: 0,
            block_number: 100,
        };

        detector.handle_transfer(&event).await.unwrap();
        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.amount, "1000000");

        let sweep_at = |height: u64| {
            let store = store.clone();
            async move {
                let mut chain = MockChainSource::new();
                chain.expect_block_number().returning(move || Ok(height));
                let tracker = ConfirmationTracker::new(
                    store,
                    Arc::new(chain),
                    6,
                    12,
                    Duration::from_secs(15),
                );
                tracker.sweep_once().await.unwrap()
            }
        };

        sweep_at(106).await;
        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Confirmed);

        sweep_at(112).await;
        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Final);

        // Redelivering the identical event after finality: no new entry, no
        // status change, balance unaffected beyond the original credit
        detector.handle_transfer(&event).await.unwrap();
        assert_eq!(store.entry_count().await, 1);
        let entry = store.get_entry("0xT1", 0).await.unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Final);

        let monitor = DepositMonitor::new(test_config(), store.clone(), idle_chain());
        assert_eq!(monitor.get_balance("w1").await.unwrap(), "1000000");
    }
}
