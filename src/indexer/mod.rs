//! Deposit Indexer Module
//!
//! Watches one token contract for transfers into registered custodial wallets
//! and maintains the append-only deposit ledger:
//!
//! ```text
//! PENDING → CONFIRMED → FINAL
//! ```
//!
//! ## Components
//!
//! - **registry**: case-insensitive snapshot of monitored addresses
//! - **watcher**: polls the chain for Transfer logs, feeds a bounded channel
//! - **detector**: single writer creating idempotent PENDING entries
//! - **tracker**: periodic sweep advancing confirmation status
//! - **service**: lifecycle controller (`start`/`stop`/`status`/`get_balance`)
//!
//! ## Flow Overview
//!
//! 1. Wallets are registered in the store (by an external provisioning layer)
//! 2. `DepositMonitor::start` snapshots the registry and spawns the tasks
//! 3. Watcher emits candidate transfers; detector records PENDING entries
//! 4. Tracker sweeps open entries as the chain grows: CONFIRMED, then FINAL
//! 5. Balances are derived on demand from FINAL entries

pub mod detector;
pub mod registry;
pub mod service;
pub mod tracker;
pub mod watcher;

// Re-exports
pub use detector::DepositDetector;
pub use registry::WalletRegistry;
pub use service::{DepositMonitor, MonitorError, MonitorStatus, StartOutcome, StopOutcome};
pub use tracker::{ConfirmationTracker, SweepSummary, TrackerError};
pub use watcher::TransferWatcher;
