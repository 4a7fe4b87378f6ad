//! Monitored Wallet Types

use serde::{Deserialize, Serialize};

/// A custodial wallet whose incoming transfers are indexed
///
/// Addresses are compared case-insensitively everywhere; the registry
/// normalizes to lowercase at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredWallet {
    /// Unique wallet ID
    pub id: String,
    /// On-chain address, as registered (any casing)
    pub address: String,
}

impl MonitoredWallet {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_construction() {
        let wallet = MonitoredWallet::new("w1", "0xAbC123");
        assert_eq!(wallet.id, "w1");
        assert_eq!(wallet.address, "0xAbC123");
    }
}
