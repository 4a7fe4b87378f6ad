//! Storage Trait Definitions
//!
//! Defines the abstract store contract the indexer consumes: atomic idempotent
//! entry creation, conditional forward-only status updates, and wallet lookups.
//! Implementations can use SQLite (production) or in-memory (testing).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::ledger::{EntryStatus, LedgerEntry};
use crate::types::wallet::MonitoredWallet;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("connection error: {0}")]
    Connection(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of an idempotent create: the caller treats both as success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new row was committed
    Created,
    /// An entry with the same `(tx_hash, log_index)` already exists
    Duplicate,
}

/// Ledger storage interface
///
/// Implementations:
/// - `SqliteLedgerStore` - Production storage with SQLite
/// - `MemoryLedgerStore` - In-memory storage for testing
///
/// Mutual exclusion against duplicate crediting lives here: the identity key
/// `(tx_hash, log_index)` is unique, so concurrent duplicate creations collapse
/// to a single committed row with the loser observing `Duplicate`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new entry unless its identity key already exists
    async fn create_entry_if_absent(&self, entry: &LedgerEntry) -> StorageResult<CreateOutcome>;

    /// Get an entry by identity key
    async fn get_entry(&self, tx_hash: &str, log_index: u64)
        -> StorageResult<Option<LedgerEntry>>;

    /// Conditionally advance an entry's status and confirmation metadata.
    ///
    /// The update applies only if it does not move the status backwards and the
    /// entry is not already FINAL. Returns whether the update was applied; a
    /// skipped update is not an error.
    async fn update_entry_status(
        &self,
        id: &str,
        status: EntryStatus,
        confirmations: u64,
        finalized_at: Option<String>,
    ) -> StorageResult<bool>;

    /// All entries with status != FINAL, for confirmation sweeps and restart
    /// recovery
    async fn list_open_entries(&self) -> StorageResult<Vec<LedgerEntry>>;

    /// All FINAL entries for one wallet, for balance derivation
    async fn list_final_entries(&self, wallet_id: &str) -> StorageResult<Vec<LedgerEntry>>;

    /// All monitored wallets
    async fn list_wallets(&self) -> StorageResult<Vec<MonitoredWallet>>;

    /// Register a wallet for monitoring
    async fn insert_wallet(&self, wallet: &MonitoredWallet) -> StorageResult<()>;
}
