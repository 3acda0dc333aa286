//! Raw block parsing and wire-format normalization.
//!
//! Upstream nodes are loose about formatting: hashes arrive with or
//! without a `0x` prefix, the transaction hash key varies between
//! `txHash` and `tx_hash`, payloads may be a string or an object, and
//! timestamps arrive in three encodings. Everything is normalized here
//! before a record reaches the ledger store.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Normalize a hash to carry a `0x` prefix.
pub fn with_hex_prefix(value: &str) -> String {
    if value.starts_with("0x") {
        value.to_string()
    } else {
        format!("0x{}", value)
    }
}

/// Wire timestamps are microseconds since the epoch; 19-digit values are
/// nanoseconds.
fn datetime_from_wire_int(raw: i64) -> DateTime<Utc> {
    if raw.abs() >= 1_000_000_000_000_000_000 {
        DateTime::from_timestamp_nanos(raw)
    } else {
        DateTime::from_timestamp_micros(raw).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Decode a wire timestamp. Accepted encodings: `0x`-prefixed hex string,
/// decimal string, and a bare JSON number. All three of one instant decode
/// to the same value.
pub fn parse_wire_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    if let Some(s) = value.as_str() {
        let raw = match s.strip_prefix("0x") {
            Some(hex) => i64::from_str_radix(hex, 16)
                .map_err(|e| anyhow!("bad hex timestamp '{}': {}", s, e))?,
            None => s
                .parse::<i64>()
                .map_err(|e| anyhow!("bad decimal timestamp '{}': {}", s, e))?,
        };
        return Ok(datetime_from_wire_int(raw));
    }

    if let Some(f) = value.as_f64() {
        return Ok(datetime_from_wire_int(f as i64));
    }

    Err(anyhow!("unsupported timestamp encoding: {}", value))
}

/// Block header fields parsed from a raw RPC result, statuses unresolved.
#[derive(Debug, Clone)]
pub struct ParsedBlock {
    pub height: i64,
    pub block_hash: String,
    pub peer_id: String,
    pub signature: String,
    pub timestamp: DateTime<Utc>,
    pub transactions: Vec<ParsedTx>,
}

#[derive(Debug, Clone)]
pub struct ParsedTx {
    pub tx_hash: String,
    pub sender: String,
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
    pub payload: String,
}

/// Parse the `result` object of a block-by-height response.
pub fn parse_block(result: &Value) -> Result<ParsedBlock> {
    let height = result["height"]
        .as_i64()
        .ok_or_else(|| anyhow!("block has no height"))?;
    let block_hash = result["block_hash"]
        .as_str()
        .map(with_hex_prefix)
        .ok_or_else(|| anyhow!("block {} has no hash", height))?;
    let peer_id = result["peer_id"]
        .as_str()
        .ok_or_else(|| anyhow!("block {} has no peer_id", height))?
        .to_string();
    let signature = result["signature"]
        .as_str()
        .ok_or_else(|| anyhow!("block {} has no signature", height))?
        .to_string();
    let timestamp = parse_wire_timestamp(&result["time_stamp"])?;

    let mut transactions = Vec::new();
    if let Some(raw_txs) = result["confirmed_transaction_list"].as_array() {
        for raw_tx in raw_txs {
            transactions.push(parse_tx(raw_tx, height)?);
        }
    }

    Ok(ParsedBlock {
        height,
        block_hash,
        peer_id,
        signature,
        timestamp,
        transactions,
    })
}

fn parse_tx(raw: &Value, height: i64) -> Result<ParsedTx> {
    // Hash key varies by node version.
    let tx_hash = raw["txHash"]
        .as_str()
        .or_else(|| raw["tx_hash"].as_str())
        .map(with_hex_prefix)
        .ok_or_else(|| anyhow!("tx in block {} has no hash", height))?;

    let sender = raw["from"]
        .as_str()
        .ok_or_else(|| anyhow!("tx {} has no sender", tx_hash))?
        .to_string();
    let recipient = raw["to"]
        .as_str()
        .ok_or_else(|| anyhow!("tx {} has no recipient", tx_hash))?
        .to_string();
    let timestamp = parse_wire_timestamp(&raw["timestamp"])?;

    // Payload may be missing, a plain string, or a structured object.
    let payload = match raw.get("data") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => serde_json::to_string(other)?,
    };

    Ok(ParsedTx {
        tx_hash,
        sender,
        recipient,
        timestamp,
        payload,
    })
}

/// Build a pseudo block result for synthetic ingestion and tests.
pub fn synthetic_block(height: i64, tx_count: usize) -> Value {
    use rand::Rng;

    fn hex_string(len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| {
                let digit: u8 = rng.gen_range(0..16);
                char::from_digit(digit as u32, 16).unwrap_or('0')
            })
            .collect()
    }

    let now_micros = Utc::now().timestamp_micros();

    let txs: Vec<Value> = (0..tx_count)
        .map(|_| {
            json!({
                "version": "0x3",
                "from": format!("hx{}", hex_string(40)),
                "to": format!("hx{}", hex_string(40)),
                "timestamp": now_micros.to_string(),
                "txHash": format!("0x{}", hex_string(64)),
                "signature": hex_string(32),
                "data": { "method": "transfer", "params": { "value": "0x1" } },
            })
        })
        .collect();

    json!({
        "version": "0.1a",
        "prev_block_hash": hex_string(64),
        "merkle_tree_root_hash": hex_string(64),
        "time_stamp": now_micros,
        "confirmed_transaction_list": txs,
        "block_hash": hex_string(64),
        "height": height,
        "peer_id": format!("hx{}", hex_string(40)),
        "signature": hex_string(80),
    })
}
