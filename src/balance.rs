//! Balance Derivation
//!
//! A wallet balance is never stored; it is the signed sum of that wallet's
//! FINAL ledger entries, computed with exact 256-bit integer arithmetic.
//! Credits add, debits subtract. The fold is commutative, so entry order
//! does not matter.

use alloy_primitives::{I256, U256};
use thiserror::Error;

use crate::storage::{LedgerStore, StorageError};
use crate::types::ledger::Direction;

/// Balance calculation errors
#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("entry {entry_id} has non-integer amount: {amount}")]
    InvalidAmount { entry_id: String, amount: String },

    #[error("balance overflow for wallet {0}")]
    Overflow(String),
}

/// Sum all FINAL entries for `wallet_id`
///
/// Returns zero for a wallet with no finalized entries (including unknown
/// wallets). An unparsable stored amount is surfaced as corruption, never
/// skipped.
pub async fn wallet_balance(
    store: &dyn LedgerStore,
    wallet_id: &str,
) -> Result<I256, BalanceError> {
    let entries = store.list_final_entries(wallet_id).await?;

    let mut balance = I256::ZERO;
    for entry in entries {
        let amount = U256::from_str_radix(&entry.amount, 10).map_err(|_| {
            BalanceError::InvalidAmount {
                entry_id: entry.id.clone(),
                amount: entry.amount.clone(),
            }
        })?;

        let amount = I256::try_from(amount)
            .map_err(|_| BalanceError::Overflow(wallet_id.to_string()))?;

        balance = match entry.direction {
            Direction::Credit => balance.checked_add(amount),
            Direction::Debit => balance.checked_sub(amount),
        }
        .ok_or_else(|| BalanceError::Overflow(wallet_id.to_string()))?;
    }

    Ok(balance)
}
