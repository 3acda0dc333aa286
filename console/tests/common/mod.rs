//! Shared test fixtures.

#![allow(dead_code)]

pub mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use console::ledger::{BlockRecord, LedgerDb, TxRecord};

    pub async fn test_ledger() -> LedgerDb {
        LedgerDb::in_memory()
            .await
            .expect("Failed to create in-memory ledger")
    }

    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    /// Deterministic block with `tx_count` transactions. Hashes derive
    /// from the height so repeated builds are identical.
    pub fn sample_block(channel: &str, height: i64, tx_count: usize) -> BlockRecord {
        let timestamp = base_time() + Duration::seconds(height);
        let transactions = (0..tx_count)
            .map(|i| TxRecord {
                tx_hash: format!("0xtx{:04x}{:02x}", height, i),
                status: "Success".to_string(),
                channel: channel.to_string(),
                block_height: height,
                timestamp: timestamp + Duration::milliseconds(i as i64),
                sender: format!("hxsender{:02x}", i),
                recipient: format!("hxrecipient{:02x}", i),
                payload: format!("{{\"method\":\"transfer\",\"nonce\":{}}}", i),
            })
            .collect();

        BlockRecord {
            channel: channel.to_string(),
            height,
            peer_id: "hxproducer00".to_string(),
            signature: format!("sig{:04x}", height),
            timestamp,
            block_hash: format!("0xblock{:04x}", height),
            transactions,
        }
    }
}
