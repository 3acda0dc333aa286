//! Transaction search and detail queries.

use anyhow::Result;
use sqlx::{QueryBuilder, Sqlite};

use crate::errors::LedgerError;

use super::blocks::tx_from_row;
use super::records::{TxFilter, TxRecord};
use super::LedgerDb;

impl LedgerDb {
    /// Search transactions in a channel. Every filter predicate narrows
    /// the result; a timestamp range with exactly one bound set is a
    /// validation error, not a partial-filter query.
    pub async fn query_txs(
        &self,
        channel: &str,
        limit: i64,
        offset: i64,
        filter: &TxFilter,
    ) -> Result<(Vec<TxRecord>, i64)> {
        if limit < 0 || offset < 0 || channel.is_empty() {
            return Err(LedgerError::InvalidQuery {
                reason: format!("limit {}, offset {}, channel '{}'", limit, offset, channel),
            }
            .into());
        }
        if filter.from.is_some() != filter.to.is_some() {
            return Err(LedgerError::InvalidTimeRange.into());
        }

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM transactions");
        push_tx_filter(&mut count_query, channel, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::new(
            "SELECT tx_hash, status, channel, block_height, timestamp, \
             sender, recipient, payload FROM transactions",
        );
        push_tx_filter(&mut query, channel, filter);
        query
            .push(" ORDER BY block_height DESC, timestamp DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = query.build().fetch_all(&self.pool).await?;
        let txs = rows.iter().map(tx_from_row).collect::<Result<Vec<_>>>()?;

        Ok((txs, total))
    }

    pub async fn query_tx_by_hash(
        &self,
        channel: &str,
        tx_hash: &str,
    ) -> Result<Option<TxRecord>> {
        let row = sqlx::query(
            r#"
            SELECT tx_hash, status, channel, block_height, timestamp,
                   sender, recipient, payload
            FROM transactions
            WHERE channel = ? AND tx_hash = ?
            "#,
        )
        .bind(channel)
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(tx_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Total transaction count in a channel.
    pub async fn tx_count(&self, channel: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE channel = ?")
            .bind(channel)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn push_tx_filter(query: &mut QueryBuilder<'_, Sqlite>, channel: &str, filter: &TxFilter) {
    query.push(" WHERE channel = ").push_bind(channel.to_string());

    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(height) = filter.block_height {
        query.push(" AND block_height = ").push_bind(height);
    }
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        query
            .push(" AND timestamp BETWEEN ")
            .push_bind(from)
            .push(" AND ")
            .push_bind(to);
    }
    if let Some(sender) = &filter.sender {
        query.push(" AND sender = ").push_bind(sender.clone());
    }
    if let Some(recipient) = &filter.recipient {
        query.push(" AND recipient = ").push_bind(recipient.clone());
    }
    if let Some(payload) = &filter.payload {
        query
            .push(" AND payload LIKE ")
            .push_bind(format!("%{}%", payload));
    }
}
