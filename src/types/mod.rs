//! Shared Types Module
//!
//! Core data model: ledger entries and monitored wallets.

pub mod ledger;
pub mod wallet;

// Re-exports for convenience
pub use ledger::{Direction, EntryKey, EntryMetadata, EntryStatus, LedgerEntry};
pub use wallet::MonitoredWallet;
