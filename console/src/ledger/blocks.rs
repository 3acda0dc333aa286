//! Block persistence and queries.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use crate::errors::LedgerError;

use super::records::{BlockRecord, TxRecord};
use super::LedgerDb;

impl LedgerDb {
    /// Highest stored height for a channel, 0 when the channel has no
    /// blocks yet. The crawl frontier resumes from here.
    pub async fn current_height(&self, channel: &str) -> Result<i64> {
        if channel.is_empty() {
            return Err(LedgerError::InvalidQuery {
                reason: "empty channel name".to_string(),
            }
            .into());
        }

        let height: Option<i64> =
            sqlx::query_scalar("SELECT MAX(height) FROM blocks WHERE channel = ?")
                .bind(channel)
                .fetch_one(&self.pool)
                .await?;

        Ok(height.unwrap_or(0))
    }

    /// Store a block and its transactions. Re-appending an already-stored
    /// height is a no-op: the unique (channel, height) and
    /// (channel, tx_hash) indexes make the insert ignore duplicates, so
    /// re-crawling never produces duplicate rows.
    pub async fn append_block(&self, block: &BlockRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO blocks (
                channel, height, peer_id, signature, timestamp, block_hash
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&block.channel)
        .bind(block.height)
        .bind(&block.peer_id)
        .bind(&block.signature)
        .bind(block.timestamp)
        .bind(&block.block_hash)
        .execute(&self.pool)
        .await?;

        for tx in &block.transactions {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO transactions (
                    tx_hash, status, channel, block_height, timestamp,
                    sender, recipient, payload
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&tx.tx_hash)
            .bind(&tx.status)
            .bind(&tx.channel)
            .bind(tx.block_height)
            .bind(tx.timestamp)
            .bind(&tx.sender)
            .bind(&tx.recipient)
            .bind(&tx.payload)
            .execute(&self.pool)
            .await?;
        }

        debug!(
            "Stored block {} in {} with {} txs",
            block.height,
            block.channel,
            block.transactions.len()
        );
        Ok(())
    }

    /// Page of blocks for a channel, newest first, with total count.
    pub async fn query_blocks(
        &self,
        channel: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<BlockRecord>, i64)> {
        if limit < 0 || offset < 0 || channel.is_empty() {
            return Err(LedgerError::InvalidQuery {
                reason: format!("limit {}, offset {}, channel '{}'", limit, offset, channel),
            }
            .into());
        }

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blocks WHERE channel = ?")
            .bind(channel)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT channel, height, peer_id, signature, timestamp, block_hash
            FROM blocks
            WHERE channel = ?
            ORDER BY height DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(channel)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut blocks = Vec::with_capacity(rows.len());
        for row in rows {
            let mut block = block_from_row(&row)?;
            block.transactions = self.block_txs(channel, block.height).await?;
            blocks.push(block);
        }

        Ok((blocks, total))
    }

    pub async fn query_block_by_height(
        &self,
        channel: &str,
        height: i64,
    ) -> Result<Option<BlockRecord>> {
        let row = sqlx::query(
            r#"
            SELECT channel, height, peer_id, signature, timestamp, block_hash
            FROM blocks
            WHERE channel = ? AND height = ?
            "#,
        )
        .bind(channel)
        .bind(height)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut block = block_from_row(&row)?;
                block.transactions = self.block_txs(channel, block.height).await?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    pub async fn query_block_by_hash(
        &self,
        channel: &str,
        block_hash: &str,
    ) -> Result<Option<BlockRecord>> {
        let row = sqlx::query(
            r#"
            SELECT channel, height, peer_id, signature, timestamp, block_hash
            FROM blocks
            WHERE channel = ? AND block_hash = ?
            "#,
        )
        .bind(channel)
        .bind(block_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut block = block_from_row(&row)?;
                block.transactions = self.block_txs(channel, block.height).await?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    pub(super) async fn block_txs(&self, channel: &str, height: i64) -> Result<Vec<TxRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT tx_hash, status, channel, block_height, timestamp,
                   sender, recipient, payload
            FROM transactions
            WHERE channel = ? AND block_height = ?
            ORDER BY timestamp DESC
            "#,
        )
        .bind(channel)
        .bind(height)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(tx_from_row).collect()
    }
}

fn block_from_row(row: &SqliteRow) -> Result<BlockRecord> {
    Ok(BlockRecord {
        channel: row.try_get("channel")?,
        height: row.try_get("height")?,
        peer_id: row.try_get("peer_id")?,
        signature: row.try_get("signature")?,
        timestamp: row.try_get("timestamp")?,
        block_hash: row.try_get("block_hash")?,
        transactions: Vec::new(),
    })
}

pub(super) fn tx_from_row(row: &SqliteRow) -> Result<TxRecord> {
    Ok(TxRecord {
        tx_hash: row.try_get("tx_hash")?,
        status: row.try_get("status")?,
        channel: row.try_get("channel")?,
        block_height: row.try_get("block_height")?,
        timestamp: row.try_get("timestamp")?,
        sender: row.try_get("sender")?,
        recipient: row.try_get("recipient")?,
        payload: row.try_get("payload")?,
    })
}
