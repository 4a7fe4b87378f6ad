//! Ledger Entry Types
//!
//! Types for the append-only deposit ledger. Every on-chain transfer to a
//! monitored wallet becomes exactly one entry, keyed by `(tx_hash, log_index)`,
//! advancing through its lifecycle:
//!
//! ```text
//! PENDING → CONFIRMED → FINAL
//! ```
//!
//! Status only moves forward. FINAL is terminal; finalized entries are never
//! deleted and only their informational metadata may change.

use serde::{Deserialize, Serialize};

/// Whether an entry adds to or subtracts from a wallet balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credit => write!(f, "credit"),
            Self::Debit => write!(f, "debit"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            _ => Err(format!("unknown direction: {}", s)),
        }
    }
}

/// Confirmation status of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Recorded, below the confirmation threshold
    Pending,
    /// Enough confirmations to be considered settled, not yet irreversible
    Confirmed,
    /// Reached the finality threshold; terminal
    Final,
}

impl EntryStatus {
    /// Position in the forward-only lifecycle
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Final => 2,
        }
    }

    /// True if moving from `self` to `next` never goes backwards
    pub fn can_advance_to(&self, next: EntryStatus) -> bool {
        next.rank() >= self.rank()
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final)
    }
}

impl Default for EntryStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Final => "final",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "final" => Ok(Self::Final),
            _ => Err(format!("unknown status: {}", s)),
        }
    }
}

/// Identity key of an on-chain log: one entry per key, ever
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub tx_hash: String,
    pub log_index: u64,
}

impl EntryKey {
    pub fn new(tx_hash: impl Into<String>, log_index: u64) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            log_index,
        }
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.log_index)
    }
}

/// Informational metadata attached to an entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Sender address of the transfer
    pub from: String,
    /// Confirmation depth at the last sweep
    pub confirmations: u64,
    /// RFC 3339 timestamp of finalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<String>,
}

/// A single append-only ledger record for a wallet credit or debit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID
    pub id: String,
    /// Wallet this entry belongs to
    pub wallet_id: String,
    /// Asset symbol, e.g. "USDT"
    pub asset: String,
    /// Credit or debit
    pub direction: Direction,
    /// Amount in the token's smallest unit, as a decimal string
    pub amount: String,
    /// Transaction hash of the originating transfer
    pub tx_hash: String,
    /// Log index within the transaction's block
    pub log_index: u64,
    /// Block the transfer was mined in
    pub block_number: u64,
    /// Current lifecycle status
    pub status: EntryStatus,
    /// Human-readable description
    pub description: String,
    /// Informational metadata
    pub metadata: EntryMetadata,
    /// Timestamp when the entry was created
    pub created_at: u64,
    /// Timestamp of last status update
    pub updated_at: u64,
}

impl LedgerEntry {
    /// Create a pending credit entry for a freshly detected transfer
    pub fn credit(
        wallet_id: impl Into<String>,
        asset: impl Into<String>,
        amount: impl Into<String>,
        tx_hash: impl Into<String>,
        log_index: u64,
        block_number: u64,
        from: impl Into<String>,
    ) -> Self {
        let now = unix_now();
        let asset = asset.into();
        let from = from.into();

        Self {
            id: format!("led_{}", uuid::Uuid::new_v4().simple()),
            wallet_id: wallet_id.into(),
            asset: asset.clone(),
            direction: Direction::Credit,
            amount: amount.into(),
            tx_hash: tx_hash.into(),
            log_index,
            block_number,
            status: EntryStatus::Pending,
            description: format!("{} deposit from {}", asset, from),
            metadata: EntryMetadata {
                from,
                confirmations: 0,
                finalized_at: None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    /// Identity key for idempotent creation
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.tx_hash.clone(), self.log_index)
    }

    /// True while the entry still needs confirmation tracking
    pub fn is_open(&self) -> bool {
        !self.status.is_final()
    }
}

/// Current unix time in seconds
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(EntryStatus::Pending.can_advance_to(EntryStatus::Confirmed));
        assert!(EntryStatus::Pending.can_advance_to(EntryStatus::Final));
        assert!(EntryStatus::Confirmed.can_advance_to(EntryStatus::Final));
        assert!(!EntryStatus::Confirmed.can_advance_to(EntryStatus::Pending));
        assert!(!EntryStatus::Final.can_advance_to(EntryStatus::Confirmed));
        // Same-status updates are allowed (metadata refresh)
        assert!(EntryStatus::Pending.can_advance_to(EntryStatus::Pending));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [EntryStatus::Pending, EntryStatus::Confirmed, EntryStatus::Final] {
            let parsed: EntryStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<EntryStatus>().is_err());
    }

    #[test]
    fn test_credit_entry_defaults() {
        let entry = LedgerEntry::credit(
            "wallet-1",
            "USDT",
            "1000000",
            "0xT1",
            0,
            100,
            "0xa11ce",
        );

        assert!(entry.id.starts_with("led_"));
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.direction, Direction::Credit);
        assert_eq!(entry.metadata.confirmations, 0);
        assert!(entry.metadata.finalized_at.is_none());
        assert!(entry.is_open());
        assert_eq!(entry.key(), EntryKey::new("0xT1", 0));
        assert!(entry.description.contains("0xa11ce"));
    }

    #[test]
    fn test_key_equality() {
        let a = EntryKey::new("0xT1", 0);
        let b = EntryKey::new("0xT1", 0);
        let c = EntryKey::new("0xT1", 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
