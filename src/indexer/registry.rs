//! Wallet Registry
//!
//! Snapshot of the monitored address set, loaded from the store once per
//! monitoring session. Lookups are O(1) and case-insensitive; addresses are
//! normalized to lowercase at load time.

use std::collections::HashMap;

use crate::storage::{LedgerStore, StorageResult};

/// In-memory snapshot of monitored wallet addresses
#[derive(Debug, Clone, Default)]
pub struct WalletRegistry {
    /// lowercase address -> wallet ID
    by_address: HashMap<String, String>,
}

impl WalletRegistry {
    /// Load a fresh snapshot from the store
    pub async fn load(store: &dyn LedgerStore) -> StorageResult<Self> {
        let mut registry = Self::default();
        registry.refresh(store).await?;
        Ok(registry)
    }

    /// Replace the snapshot with the store's current wallet set
    pub async fn refresh(&mut self, store: &dyn LedgerStore) -> StorageResult<()> {
        let wallets = store.list_wallets().await?;

        self.by_address = wallets
            .into_iter()
            .map(|w| (w.address.to_lowercase(), w.id))
            .collect();

        Ok(())
    }

    /// Whether `address` is monitored, ignoring case
    pub fn contains(&self, address: &str) -> bool {
        self.by_address.contains_key(&address.to_lowercase())
    }

    /// Wallet ID for `address`, ignoring case
    pub fn wallet_id(&self, address: &str) -> Option<&str> {
        self.by_address
            .get(&address.to_lowercase())
            .map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLedgerStore;
    use crate::types::wallet::MonitoredWallet;

    #[tokio::test]
    async fn test_load_and_lookup_case_insensitive() {
        let store = MemoryLedgerStore::new();
        store
            .insert_wallet(&MonitoredWallet::new(
                "w1",
                "0xAbCdEf1234567890aBcDeF1234567890AbCdEf12",
            ))
            .await
            .unwrap();

        let registry = WalletRegistry::load(&store).await.unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("0xabcdef1234567890abcdef1234567890abcdef12"));
        assert!(registry.contains("0xABCDEF1234567890ABCDEF1234567890ABCDEF12"));
        assert_eq!(
            registry.wallet_id("0xAbCdEf1234567890aBcDeF1234567890AbCdEf12"),
            Some("w1")
        );
        assert!(!registry.contains("0x0000000000000000000000000000000000000000"));
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let store = MemoryLedgerStore::new();
        let registry = WalletRegistry::load(&store).await.unwrap();

        assert!(registry.is_empty());
        assert!(!registry.contains("0xanything"));
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_wallets() {
        let store = MemoryLedgerStore::new();
        let mut registry = WalletRegistry::load(&store).await.unwrap();
        assert!(registry.is_empty());

        store
            .insert_wallet(&MonitoredWallet::new("w1", "0xAAA"))
            .await
            .unwrap();
        registry.refresh(&store).await.unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("0xaaa"));
    }
}
