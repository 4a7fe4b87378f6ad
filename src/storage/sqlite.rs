//! SQLite Persistent Storage for the Deposit Ledger
//!
//! Provides durable storage for ledger entries that survives service restarts.
//! Uses connection pooling via r2d2 for concurrent access. The identity key
//! `(tx_hash, log_index)` is a UNIQUE constraint, so idempotent creation and
//! duplicate collapse happen inside the database, not in process memory.

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;

use super::traits::{CreateOutcome, LedgerStore, StorageError, StorageResult};
use crate::types::ledger::{unix_now, Direction, EntryMetadata, EntryStatus, LedgerEntry};
use crate::types::wallet::MonitoredWallet;

/// SQLite-backed ledger store with connection pooling
pub struct SqliteLedgerStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteLedgerStore {
    /// Create a new store with the given database path
    ///
    /// Creates the database file and runs migrations if needed.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Get a connection from the pool
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool
            .get()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_entries (
                id TEXT PRIMARY KEY,
                wallet_id TEXT NOT NULL,
                asset TEXT NOT NULL,
                direction TEXT NOT NULL,
                amount TEXT NOT NULL,
                tx_hash TEXT NOT NULL,
                log_index INTEGER NOT NULL,
                block_number INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                description TEXT NOT NULL DEFAULT '',
                from_address TEXT NOT NULL DEFAULT '',
                confirmations INTEGER NOT NULL DEFAULT 0,
                finalized_at TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(tx_hash, log_index)
            );

            CREATE INDEX IF NOT EXISTS idx_ledger_status ON ledger_entries(status);
            CREATE INDEX IF NOT EXISTS idx_ledger_wallet ON ledger_entries(wallet_id);

            CREATE TABLE IF NOT EXISTS wallets (
                id TEXT PRIMARY KEY,
                address TEXT NOT NULL UNIQUE
            );
            "#,
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    /// Convert a database row to LedgerEntry
    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<LedgerEntry> {
        let status_str: String = row.get("status")?;
        let status = status_str.parse().unwrap_or(EntryStatus::Pending);

        let direction_str: String = row.get("direction")?;
        let direction = direction_str.parse().unwrap_or(Direction::Credit);

        Ok(LedgerEntry {
            id: row.get("id")?,
            wallet_id: row.get("wallet_id")?,
            asset: row.get("asset")?,
            direction,
            amount: row.get("amount")?,
            tx_hash: row.get("tx_hash")?,
            log_index: row.get::<_, i64>("log_index")? as u64,
            block_number: row.get::<_, i64>("block_number")? as u64,
            status,
            description: row.get("description")?,
            metadata: EntryMetadata {
                from: row.get("from_address")?,
                confirmations: row.get::<_, i64>("confirmations")? as u64,
                finalized_at: row.get("finalized_at")?,
            },
            created_at: row.get::<_, i64>("created_at")? as u64,
            updated_at: row.get::<_, i64>("updated_at")? as u64,
        })
    }

    // Synchronous helpers for the trait implementation

    fn insert_entry_sync(&self, entry: &LedgerEntry) -> Result<CreateOutcome, StorageError> {
        let conn = self.conn()?;

        let result = conn.execute(
            r#"
            INSERT INTO ledger_entries (
                id, wallet_id, asset, direction, amount,
                tx_hash, log_index, block_number, status, description,
                from_address, confirmations, finalized_at, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15
            )
            "#,
            params![
                entry.id,
                entry.wallet_id,
                entry.asset,
                entry.direction.to_string(),
                entry.amount,
                entry.tx_hash,
                entry.log_index as i64,
                entry.block_number as i64,
                entry.status.to_string(),
                entry.description,
                entry.metadata.from,
                entry.metadata.confirmations as i64,
                entry.metadata.finalized_at,
                entry.created_at as i64,
                entry.updated_at as i64,
            ],
        );

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == 1555 || err.extended_code == 2067 =>
            {
                // UNIQUE conflict on (tx_hash, log_index): idempotent no-op
                Ok(CreateOutcome::Duplicate)
            }
            Err(e) => Err(StorageError::Database(e.to_string())),
        }
    }

    fn update_status_sync(
        &self,
        id: &str,
        status: EntryStatus,
        confirmations: u64,
        finalized_at: Option<String>,
    ) -> Result<bool, StorageError> {
        let conn = self.conn()?;

        // The rank comparison makes the update conditional and forward-only
        // inside the database, so concurrent sweeps cannot regress a status.
        let rows_affected = conn
            .execute(
                r#"
            UPDATE ledger_entries SET
                status = ?2,
                confirmations = ?3,
                finalized_at = COALESCE(?4, finalized_at),
                updated_at = ?5
            WHERE id = ?1
              AND status != 'final'
              AND (CASE status
                     WHEN 'pending' THEN 0
                     WHEN 'confirmed' THEN 1
                     ELSE 2
                   END) <= ?6
            "#,
                params![
                    id,
                    status.to_string(),
                    confirmations as i64,
                    finalized_at,
                    unix_now() as i64,
                    status.rank() as i64,
                ],
            )
            .map_err(|e| StorageError::Database(e.to_string()))?;

        if rows_affected == 0 {
            // Distinguish "missing" from "update skipped"
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM ledger_entries WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StorageError::Database(e.to_string()))?;

            if exists.is_none() {
                return Err(StorageError::NotFound(id.to_string()));
            }
        }

        Ok(rows_affected > 0)
    }

    fn get_entry_sync(
        &self,
        tx_hash: &str,
        log_index: u64,
    ) -> Result<Option<LedgerEntry>, StorageError> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT * FROM ledger_entries WHERE tx_hash = ?1 AND log_index = ?2",
            params![tx_hash, log_index as i64],
            Self::row_to_entry,
        )
        .optional()
        .map_err(|e| StorageError::Database(e.to_string()))
    }

    fn list_by_filter_sync(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<LedgerEntry>, StorageError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params, Self::row_to_entry)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Database(e.to_string()))
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn create_entry_if_absent(&self, entry: &LedgerEntry) -> StorageResult<CreateOutcome> {
        self.insert_entry_sync(entry)
    }

    async fn get_entry(
        &self,
        tx_hash: &str,
        log_index: u64,
    ) -> StorageResult<Option<LedgerEntry>> {
        self.get_entry_sync(tx_hash, log_index)
    }

    async fn update_entry_status(
        &self,
        id: &str,
        status: EntryStatus,
        confirmations: u64,
        finalized_at: Option<String>,
    ) -> StorageResult<bool> {
        self.update_status_sync(id, status, confirmations, finalized_at)
    }

    async fn list_open_entries(&self) -> StorageResult<Vec<LedgerEntry>> {
        self.list_by_filter_sync(
            "SELECT * FROM ledger_entries WHERE status != 'final' ORDER BY block_number",
            &[],
        )
    }

    async fn list_final_entries(&self, wallet_id: &str) -> StorageResult<Vec<LedgerEntry>> {
        self.list_by_filter_sync(
            "SELECT * FROM ledger_entries WHERE status = 'final' AND wallet_id = ?1",
            &[&wallet_id],
        )
    }

    async fn list_wallets(&self) -> StorageResult<Vec<MonitoredWallet>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare("SELECT id, address FROM wallets")
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(MonitoredWallet {
                    id: row.get(0)?,
                    address: row.get(1)?,
                })
            })
            .map_err(|e| StorageError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Database(e.to_string()))
    }

    async fn insert_wallet(&self, wallet: &MonitoredWallet) -> StorageResult<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT OR REPLACE INTO wallets (id, address) VALUES (?1, ?2)",
            params![wallet.id, wallet.address],
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }
}
