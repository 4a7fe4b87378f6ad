//! Environment-based Configuration for depositd
//!
//! Configuration is loaded from environment variables at startup; missing or
//! invalid required values are fatal then, never per-event.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DEPOSITD_RPC_URL` - Ethereum JSON-RPC endpoint URL
//! - `DEPOSITD_TOKEN_ADDRESS` - ERC-20 token contract to watch
//!
//! ## Optional
//! - `DEPOSITD_ASSET` - Asset symbol recorded on ledger entries (default: "USDT")
//! - `DEPOSITD_REQUIRED_CONFIRMATIONS` - Depth at which entries become FINAL (default: 12)
//! - `DEPOSITD_CONFIRM_THRESHOLD` - Depth at which entries become CONFIRMED (default: 6)
//! - `DEPOSITD_POLL_INTERVAL_SECS` - Transfer-log polling interval (default: 15)
//! - `DEPOSITD_SWEEP_INTERVAL_SECS` - Confirmation sweep interval (default: 15)
//! - `DEPOSITD_CHANNEL_CAPACITY` - Bounded event channel size (default: 256)
//! - `DEPOSITD_DB_PATH` - SQLite database path (default: "depositd.db")
//! - `DEPOSITD_LOG_LEVEL` - Logging level (debug, info, warn, error; default: info)
//! - `DEPOSITD_LOG_JSON` - Set to "1" for JSON log output

use std::env;
use std::str::FromStr;

use alloy_primitives::Address;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Ethereum JSON-RPC endpoint
    pub rpc_url: String,

    /// ERC-20 token contract to watch
    pub token_address: Address,

    /// Asset symbol recorded on ledger entries
    pub asset: String,

    /// Confirmation depth at which entries become FINAL
    pub required_confirmations: u64,

    /// Confirmation depth at which entries become CONFIRMED
    pub confirm_threshold: u64,

    /// Transfer-log polling interval in seconds
    pub poll_interval_secs: u64,

    /// Confirmation sweep interval in seconds
    pub sweep_interval_secs: u64,

    /// Bounded event channel capacity
    pub channel_capacity: usize,

    /// SQLite database path
    pub db_path: String,

    /// Log level
    pub log_level: String,

    /// Emit JSON-formatted logs
    pub log_json: bool,
}

impl IndexerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_url = required("DEPOSITD_RPC_URL")?;

        let token_raw = required("DEPOSITD_TOKEN_ADDRESS")?;
        let token_address = Address::from_str(&token_raw).map_err(|e| {
            ConfigError::InvalidValue("DEPOSITD_TOKEN_ADDRESS".to_string(), e.to_string())
        })?;

        let config = Self {
            rpc_url,
            token_address,
            asset: env::var("DEPOSITD_ASSET").unwrap_or_else(|_| "USDT".to_string()),
            required_confirmations: parsed_or("DEPOSITD_REQUIRED_CONFIRMATIONS", 12)?,
            confirm_threshold: parsed_or("DEPOSITD_CONFIRM_THRESHOLD", 6)?,
            poll_interval_secs: parsed_or("DEPOSITD_POLL_INTERVAL_SECS", 15)?,
            sweep_interval_secs: parsed_or("DEPOSITD_SWEEP_INTERVAL_SECS", 15)?,
            channel_capacity: parsed_or("DEPOSITD_CHANNEL_CAPACITY", 256)?,
            db_path: env::var("DEPOSITD_DB_PATH").unwrap_or_else(|_| "depositd.db".to_string()),
            log_level: env::var("DEPOSITD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("DEPOSITD_LOG_JSON").map(|v| v == "1").unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.required_confirmations == 0 {
            return Err(ConfigError::InvalidValue(
                "DEPOSITD_REQUIRED_CONFIRMATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        if self.poll_interval_secs == 0 || self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "DEPOSITD_POLL_INTERVAL_SECS".to_string(),
                "intervals must be at least 1 second".to_string(),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "DEPOSITD_CHANNEL_CAPACITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Get a required env var
fn required(var_name: &str) -> Result<String, ConfigError> {
    env::var(var_name).map_err(|_| ConfigError::MissingEnvVar(var_name.to_string()))
}

/// Parse an optional env var, falling back to a default when unset.
/// An unparsable value is fatal, not silently defaulted.
fn parsed_or<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(var_name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(var_name.to_string(), e.to_string())),
    }
}
