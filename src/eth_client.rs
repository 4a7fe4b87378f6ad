//! Minimal Ethereum JSON-RPC Client
//!
//! Speaks just enough JSON-RPC for deposit indexing: current block height and
//! ERC-20 `Transfer` logs for a single token contract. Network failures are
//! retryable errors; callers poll again on their next tick.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Chain client error types
#[derive(Debug, thiserror::Error)]
pub enum EthClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("missing result for {0}")]
    MissingResult(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// A decoded ERC-20 Transfer log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    /// Raw value in the token's smallest unit
    pub value: U256,
    pub tx_hash: String,
    pub log_index: u64,
    pub block_number: u64,
}

/// The chain operations the indexer consumes
///
/// `EthClient` is the production implementation; tests mock this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current chain head height
    async fn block_number(&self) -> Result<u64, EthClientError>;

    /// Decoded Transfer logs for `token` in the inclusive block range
    async fn transfer_logs(
        &self,
        token: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, EthClientError>;
}

/// Ethereum JSON-RPC client over HTTP
#[derive(Debug)]
pub struct EthClient {
    client: Client,
    rpc_url: String,
    request_id: AtomicU64,
}

impl EthClient {
    /// Create a new client for the given RPC endpoint
    pub fn new(rpc_url: &str) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            request_id: AtomicU64::new(1),
        }
    }

    /// Get the RPC endpoint URL
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Issue a single JSON-RPC call
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, EthClientError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp = self.client.post(&self.rpc_url).json(&body).send().await?;
        let rpc: RpcResponse<T> = resp.json().await?;

        if let Some(err) = rpc.error {
            return Err(EthClientError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        rpc.result
            .ok_or_else(|| EthClientError::MissingResult(method.to_string()))
    }
}

#[async_trait]
impl ChainSource for EthClient {
    async fn block_number(&self) -> Result<u64, EthClientError> {
        let hex: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&hex)
    }

    async fn transfer_logs(
        &self,
        token: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, EthClientError> {
        let filter = json!([{
            "address": format!("{:#x}", token),
            "fromBlock": format!("{:#x}", from_block),
            "toBlock": format!("{:#x}", to_block),
            "topics": [TRANSFER_TOPIC],
        }]);

        let raw: Vec<RawLog> = self.call("eth_getLogs", filter).await?;

        let mut events = Vec::with_capacity(raw.len());
        for log in raw {
            match decode_transfer(&log) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {} // not a standard Transfer log
                Err(e) => {
                    debug!(error = %e, "skipping undecodable log");
                }
            }
        }

        Ok(events)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Raw log as returned by eth_getLogs
#[derive(Debug, Deserialize)]
struct RawLog {
    topics: Vec<String>,
    data: String,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
    #[serde(rename = "transactionHash")]
    transaction_hash: Option<String>,
    #[serde(rename = "logIndex")]
    log_index: Option<String>,
}

/// Parse a JSON-RPC hex quantity ("0x10" -> 16)
fn parse_quantity(s: &str) -> Result<u64, EthClientError> {
    let digits = s.trim_start_matches("0x");
    u64::from_str_radix(digits, 16)
        .map_err(|e| EthClientError::Decode(format!("invalid quantity {}: {}", s, e)))
}

/// Extract the address packed into a 32-byte log topic
fn parse_topic_address(topic: &str) -> Result<Address, EthClientError> {
    let bytes = hex::decode(topic.trim_start_matches("0x"))
        .map_err(|e| EthClientError::Decode(format!("invalid topic {}: {}", topic, e)))?;

    if bytes.len() != 32 {
        return Err(EthClientError::Decode(format!(
            "topic is {} bytes, expected 32",
            bytes.len()
        )));
    }

    Ok(Address::from_slice(&bytes[12..]))
}

/// Parse the 32-byte data word holding the transfer value
fn parse_value(data: &str) -> Result<U256, EthClientError> {
    let digits = data.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 16)
        .map_err(|e| EthClientError::Decode(format!("invalid value {}: {}", data, e)))
}

/// Decode one raw log into a TransferEvent
///
/// Returns Ok(None) for logs that are not standard indexed Transfer events or
/// that are still pending (missing block fields).
fn decode_transfer(log: &RawLog) -> Result<Option<TransferEvent>, EthClientError> {
    if log.topics.len() != 3 || log.topics[0] != TRANSFER_TOPIC {
        return Ok(None);
    }

    let (Some(block_number), Some(tx_hash), Some(log_index)) = (
        log.block_number.as_deref(),
        log.transaction_hash.as_deref(),
        log.log_index.as_deref(),
    ) else {
        return Ok(None);
    };

    Ok(Some(TransferEvent {
        from: parse_topic_address(&log.topics[1])?,
        to: parse_topic_address(&log.topics[2])?,
        value: parse_value(&log.data)?,
        tx_hash: tx_hash.to_string(),
        log_index: parse_quantity(log_index)?,
        block_number: parse_quantity(block_number)?,
    }))
}
