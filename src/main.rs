//! depositd - Deposit Monitor Daemon
//!
//! Loads configuration from the environment, opens the SQLite ledger, and runs
//! the deposit monitor until ctrl-c.
//!
//! Required environment (see `config.rs` for the full list):
//!   DEPOSITD_RPC_URL        Ethereum JSON-RPC endpoint
//!   DEPOSITD_TOKEN_ADDRESS  ERC-20 token contract to watch

use std::process;
use std::sync::Arc;

use depositd::config::IndexerConfig;
use depositd::eth_client::EthClient;
use depositd::indexer::{DepositMonitor, StartOutcome};
use depositd::logging;
use depositd::storage::SqliteLedgerStore;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Missing or invalid configuration is fatal at startup, never per-event
    let config = match IndexerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = logging::init_from_config(&config) {
        eprintln!("logging error: {}", e);
        process::exit(1);
    }

    let store = match SqliteLedgerStore::new(&config.db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(db_path = %config.db_path, error = %e, "could not open ledger database");
            process::exit(1);
        }
    };

    let chain = Arc::new(EthClient::new(&config.rpc_url));

    info!(
        rpc_url = %config.rpc_url,
        token = %config.token_address,
        asset = %config.asset,
        db_path = %config.db_path,
        "depositd starting"
    );

    let monitor = DepositMonitor::new(config, store, chain);

    match monitor.start().await {
        Ok(StartOutcome::Started { wallets }) => {
            info!(wallets, "monitoring; press ctrl-c to stop");
        }
        Ok(StartOutcome::NoWallets) => {
            warn!("no wallets registered, exiting");
            return;
        }
        Ok(StartOutcome::AlreadyRunning) => {}
        Err(e) => {
            error!(error = %e, "could not start monitoring");
            process::exit(1);
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }

    monitor.stop().await;
}
