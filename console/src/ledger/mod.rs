//! Ledger store: idempotent persistence of crawled blocks, transactions,
//! and symptom events over SQLite.
//!
//! Submodules:
//! - `records` - record types (entities)
//! - `blocks` - block persistence and queries
//! - `txs` - transaction search and detail queries
//! - `symptoms` - symptom append and search

mod blocks;
mod records;
mod symptoms;
mod txs;

pub use records::*;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::info;

pub struct LedgerDb {
    pool: Pool<Sqlite>,
}

impl LedgerDb {
    /// Expose pool for integration test queries
    #[allow(dead_code)]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn new(database_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        info!("Connecting to ledger database at {}", database_path);

        let pool = SqlitePoolOptions::new().connect(&database_url).await?;

        let db = Self { pool };
        db.initialize_tables().await?;
        info!("Ledger database initialized");
        Ok(db)
    }

    /// In-memory store for tests and synthetic ingestion. A single
    /// connection keeps every query on the same memory database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.initialize_tables().await?;
        Ok(db)
    }

    async fn initialize_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blocks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                channel TEXT NOT NULL,
                height INTEGER NOT NULL,
                peer_id TEXT NOT NULL,
                signature TEXT NOT NULL,
                timestamp DATETIME NOT NULL,
                block_hash TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_blocks_channel_height
             ON blocks(channel, height)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_blocks_channel_hash
             ON blocks(channel, block_hash)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tx_hash TEXT NOT NULL,
                status TEXT NOT NULL,
                channel TEXT NOT NULL,
                block_height INTEGER NOT NULL,
                timestamp DATETIME NOT NULL,
                sender TEXT NOT NULL,
                recipient TEXT NOT NULL,
                payload TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_txs_channel_hash
             ON transactions(channel, tx_hash)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_txs_channel_height
             ON transactions(channel, block_height DESC)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS symptoms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                channel TEXT NOT NULL,
                channel_key TEXT NOT NULL,
                message TEXT NOT NULL,
                kind TEXT NOT NULL,
                timestamp DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_symptoms_timestamp
             ON symptoms(timestamp DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
