//! Symptom append and search.
//!
//! Symptoms are append-only breach events, written once per tick a node
//! stays non-Normal. They are never updated or deleted here.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::errors::LedgerError;

use super::records::{SymptomKind, SymptomRecord};
use super::LedgerDb;

impl LedgerDb {
    pub async fn append_symptom(
        &self,
        channel: &str,
        channel_key: &str,
        kind: SymptomKind,
        message: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO symptoms (channel, channel_key, message, kind, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(channel)
        .bind(channel_key)
        .bind(message)
        .bind(kind.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Page of symptoms, newest first, restricted to the given channel
    /// keys. An optional inclusive time range must supply both bounds or
    /// neither.
    pub async fn query_symptoms(
        &self,
        limit: i64,
        offset: i64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        channel_keys: &[String],
    ) -> Result<(Vec<SymptomRecord>, i64)> {
        if limit < 0 || offset < 0 {
            return Err(LedgerError::InvalidQuery {
                reason: format!("limit {}, offset {}", limit, offset),
            }
            .into());
        }
        if from.is_some() != to.is_some() {
            return Err(LedgerError::InvalidTimeRange.into());
        }
        if channel_keys.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM symptoms");
        push_symptom_filter(&mut count_query, from, to, channel_keys);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::new(
            "SELECT channel, channel_key, message, kind, timestamp FROM symptoms",
        );
        push_symptom_filter(&mut query, from, to, channel_keys);
        query
            .push(" ORDER BY timestamp DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = query.build().fetch_all(&self.pool).await?;
        let symptoms = rows
            .iter()
            .map(symptom_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok((symptoms, total))
    }
}

fn push_symptom_filter(
    query: &mut QueryBuilder<'_, Sqlite>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    channel_keys: &[String],
) {
    query.push(" WHERE channel_key IN (");
    let mut keys = query.separated(", ");
    for key in channel_keys {
        keys.push_bind(key.clone());
    }
    query.push(")");

    if let (Some(from), Some(to)) = (from, to) {
        query
            .push(" AND timestamp BETWEEN ")
            .push_bind(from)
            .push(" AND ")
            .push_bind(to);
    }
}

fn symptom_from_row(row: &SqliteRow) -> Result<SymptomRecord> {
    Ok(SymptomRecord {
        channel: row.try_get("channel")?,
        channel_key: row.try_get("channel_key")?,
        message: row.try_get("message")?,
        kind: row.try_get("kind")?,
        timestamp: row.try_get("timestamp")?,
    })
}
