//! depositd - Deposit Indexing and Ledger Reconciliation
//!
//! Watches an EVM chain for ERC-20 transfers into registered custodial wallets
//! and maintains an append-only ledger of credits whose confirmation status
//! only moves forward as the chain grows.
//!
//! ## Guarantees
//!
//! 1. **Exactly one ledger entry per on-chain transfer** - duplicate event
//!    delivery, restarts, and out-of-order notification all collapse on the
//!    store's unique `(tx_hash, log_index)` key
//! 2. **Monotonic confirmation status** - PENDING → CONFIRMED → FINAL, never
//!    backwards; FINAL is terminal
//! 3. **Exact balances** - signed 256-bit integer sums over FINAL entries, no
//!    floating point anywhere in the balance path
//!
//! Authentication, multisig signing, payout policy, and the HTTP API live in
//! external collaborators; this crate is the indexing core they consume.

pub mod balance;
pub mod common;
pub mod config;
pub mod eth_client;
pub mod indexer;
pub mod logging;
pub mod storage;
pub mod types;

// Re-exports: root error type
pub use common::{DepositdError, Result};

// Re-exports: configuration
pub use config::{ConfigError, IndexerConfig};

// Re-exports: chain client
pub use eth_client::{ChainSource, EthClient, EthClientError, TransferEvent};

// Re-exports: indexer
pub use indexer::{
    ConfirmationTracker, DepositDetector, DepositMonitor, MonitorStatus, StartOutcome,
    StopOutcome, TransferWatcher, WalletRegistry,
};

// Re-exports: storage
pub use storage::{
    CreateOutcome, LedgerStore, MemoryLedgerStore, SqliteLedgerStore, StorageError,
};

// Re-exports: core types
pub use types::{Direction, EntryKey, EntryStatus, LedgerEntry, MonitoredWallet};
