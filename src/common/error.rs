//! Common Error Types for depositd
//!
//! Provides unified error handling across all modules.

use thiserror::Error;

/// Root error type for depositd
#[derive(Debug, Error)]
pub enum DepositdError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Logging errors
    #[error("logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    /// Storage errors
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// Chain RPC errors
    #[error("chain error: {0}")]
    Chain(#[from] crate::eth_client::EthClientError),

    /// Monitor lifecycle errors
    #[error("monitor error: {0}")]
    Monitor(#[from] crate::indexer::MonitorError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DepositdError {
    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DepositdError::Chain(_) | DepositdError::Storage(_) | DepositdError::Io(_)
        )
    }
}

/// Result type alias using DepositdError
pub type Result<T> = std::result::Result<T, DepositdError>;
