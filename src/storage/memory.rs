//! In-Memory Storage Implementation
//!
//! Provides in-memory ledger storage for testing and development.
//! Data is lost when the service restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{CreateOutcome, LedgerStore, StorageError, StorageResult};
use crate::types::ledger::{unix_now, EntryKey, EntryStatus, LedgerEntry};
use crate::types::wallet::MonitoredWallet;

/// In-memory ledger store
///
/// Thread-safe storage for ledger entries and monitored wallets.
/// Uses Arc<RwLock<>> for concurrent access.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    /// Entries indexed by entry ID
    entries: Arc<RwLock<HashMap<String, LedgerEntry>>>,
    /// Index: identity key -> entry ID
    by_key: Arc<RwLock<HashMap<EntryKey, String>>>,
    /// Monitored wallets indexed by wallet ID
    wallets: Arc<RwLock<HashMap<String, MonitoredWallet>>>,
}

impl MemoryLedgerStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn create_entry_if_absent(&self, entry: &LedgerEntry) -> StorageResult<CreateOutcome> {
        let mut entries = self.entries.write().await;
        let mut by_key = self.by_key.write().await;

        let key = entry.key();
        if by_key.contains_key(&key) {
            return Ok(CreateOutcome::Duplicate);
        }

        by_key.insert(key, entry.id.clone());
        entries.insert(entry.id.clone(), entry.clone());

        Ok(CreateOutcome::Created)
    }

    async fn get_entry(
        &self,
        tx_hash: &str,
        log_index: u64,
    ) -> StorageResult<Option<LedgerEntry>> {
        let by_key = self.by_key.read().await;
        let id = match by_key.get(&EntryKey::new(tx_hash, log_index)) {
            Some(id) => id.clone(),
            None => return Ok(None),
        };
        drop(by_key);

        let entries = self.entries.read().await;
        Ok(entries.get(&id).cloned())
    }

    async fn update_entry_status(
        &self,
        id: &str,
        status: EntryStatus,
        confirmations: u64,
        finalized_at: Option<String>,
    ) -> StorageResult<bool> {
        let mut entries = self.entries.write().await;

        let entry = entries
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        if entry.status.is_final() || !entry.status.can_advance_to(status) {
            return Ok(false);
        }

        entry.status = status;
        entry.metadata.confirmations = confirmations;
        if finalized_at.is_some() {
            entry.metadata.finalized_at = finalized_at;
        }
        entry.updated_at = unix_now();

        Ok(true)
    }

    async fn list_open_entries(&self) -> StorageResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.values().filter(|e| e.is_open()).cloned().collect())
    }

    async fn list_final_entries(&self, wallet_id: &str) -> StorageResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|e| e.status.is_final() && e.wallet_id == wallet_id)
            .cloned()
            .collect())
    }

    async fn list_wallets(&self) -> StorageResult<Vec<MonitoredWallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.values().cloned().collect())
    }

    async fn insert_wallet(&self, wallet: &MonitoredWallet) -> StorageResult<()> {
        let mut wallets = self.wallets.write().await;
        wallets.insert(wallet.id.clone(), wallet.clone());
        Ok(())
    }
}
