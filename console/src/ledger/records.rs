//! Record types persisted by the ledger store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rpc::TxStatus;

/// A crawled block. Identity is (channel, height); (channel, block_hash)
/// is a secondary lookup key. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    pub channel: String,
    pub height: i64,
    pub peer_id: String,
    pub signature: String,
    pub timestamp: DateTime<Utc>,
    pub block_hash: String,
    pub transactions: Vec<TxRecord>,
}

/// A confirmed transaction, stored alongside its block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx_hash: String,
    pub status: String,
    pub channel: String,
    pub block_height: i64,
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub recipient: String,
    pub payload: String,
}

/// A recorded health-threshold breach. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomRecord {
    pub channel: String,
    pub channel_key: String,
    pub message: String,
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

/// Kind of threshold breach a symptom records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymptomKind {
    SlowResponse,
    UnsyncBlock,
}

impl SymptomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymptomKind::SlowResponse => "SlowResponse",
            SymptomKind::UnsyncBlock => "UnsyncBlock",
        }
    }
}

/// Intersection of optional transaction search predicates. A timestamp
/// range must supply both bounds or neither.
#[derive(Debug, Clone, Default)]
pub struct TxFilter {
    pub status: Option<TxStatus>,
    pub block_height: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub payload: Option<String>,
}
