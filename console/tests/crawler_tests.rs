//! Block crawler behavior against a mock chain node: end-to-end crawl,
//! resume from the stored frontier, and the parallel batch path.

mod common;

use std::sync::Arc;

use common::fixtures::test_ledger;
use console::crawler::{ingest, BlockCrawler};
use console::ledger::LedgerDb;
use console::rpc::ChainRpcClient;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHANNEL: &str = "payments";
const RPC_PATH: &str = "/api/v3/payments";

/// Deterministic block result with two transactions per block.
fn block_result(height: i64) -> Value {
    json!({
        "version": "0.1a",
        "prev_block_hash": format!("prev{:04x}", height),
        "merkle_tree_root_hash": format!("merkle{:04x}", height),
        "time_stamp": 1_700_000_000_000_000i64 + height * 1_000_000,
        "confirmed_transaction_list": [
            {
                "from": "hxaaaa",
                "to": "hxbbbb",
                "timestamp": (1_700_000_000_000_000i64 + height * 1_000_000).to_string(),
                "txHash": format!("0xtx{:04x}00", height),
                "data": "first"
            },
            {
                "from": "hxcccc",
                "to": "hxdddd",
                "timestamp": format!("0x{:x}", 1_700_000_000_000_000i64 + height * 1_000_000),
                "tx_hash": format!("tx{:04x}01", height),
                "data": { "method": "transfer" }
            }
        ],
        "block_hash": format!("block{:04x}", height),
        "height": height,
        "peer_id": "hxproducer",
        "signature": format!("sig{:04x}", height)
    })
}

async fn mock_node(tip: i64) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({ "method": "icx_getLastBlock" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": { "height": tip } })),
        )
        .mount(&server)
        .await;

    for height in 1..=tip {
        Mock::given(method("POST"))
            .and(path(RPC_PATH))
            .and(body_partial_json(json!({
                "method": "icx_getBlockByHeight",
                "params": { "height": format!("0x{:x}", height) }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": block_result(height)
            })))
            .mount(&server)
            .await;
    }

    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({ "method": "icx_getTransactionResult" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "status": "0x1" }
        })))
        .mount(&server)
        .await;

    server
}

fn crawler(ledger: Arc<LedgerDb>, max_batch_size: Option<usize>) -> BlockCrawler {
    BlockCrawler::new(ChainRpcClient::new().unwrap(), ledger, max_batch_size)
}

#[tokio::test]
async fn crawls_empty_store_to_tip() {
    let server = mock_node(3).await;
    let ledger = Arc::new(test_ledger().await);
    let crawler = crawler(ledger.clone(), None);

    crawler
        .crawl_channel(CHANNEL, &[server.uri()])
        .await
        .unwrap();

    assert_eq!(ledger.current_height(CHANNEL).await.unwrap(), 3);
    let (blocks, total) = ledger.query_blocks(CHANNEL, 10, 0).await.unwrap();
    assert_eq!(total, 3);

    for block in &blocks {
        assert_eq!(block.transactions.len(), 2);
        assert!(block.block_hash.starts_with("0x"));
        for tx in &block.transactions {
            assert!(tx.tx_hash.starts_with("0x"));
            assert_eq!(tx.status, "Success");
            assert_eq!(tx.block_height, block.height);
        }
    }

    // Both timestamp encodings in a block decode to the same instant.
    let block = ledger
        .query_block_by_height(CHANNEL, 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        block.transactions[0].timestamp,
        block.transactions[1].timestamp
    );
}

#[tokio::test]
async fn resumes_from_stored_frontier() {
    let server = mock_node(8).await;
    let ledger = Arc::new(test_ledger().await);
    let crawler = crawler(ledger.clone(), None);

    // Seed heights 1..=3 through synthetic ingestion.
    for height in 1..=3 {
        crawler
            .ingest_block(CHANNEL, None, &block_result(height))
            .await
            .unwrap();
    }
    assert_eq!(ledger.current_height(CHANNEL).await.unwrap(), 3);

    crawler
        .crawl_channel(CHANNEL, &[server.uri()])
        .await
        .unwrap();

    // Exactly heights 4..=8 were added.
    assert_eq!(ledger.current_height(CHANNEL).await.unwrap(), 8);
    let (_, total) = ledger.query_blocks(CHANNEL, 20, 0).await.unwrap();
    assert_eq!(total, 8);
    assert_eq!(ledger.tx_count(CHANNEL).await.unwrap(), 16);
}

#[tokio::test]
async fn parallel_batches_cover_the_range_exactly() {
    // A batch cap of 2 forces the parallel path for this backlog.
    let server = mock_node(7).await;
    let ledger = Arc::new(test_ledger().await);
    let crawler = crawler(ledger.clone(), Some(2));

    crawler
        .crawl_channel(CHANNEL, &[server.uri()])
        .await
        .unwrap();

    assert_eq!(ledger.current_height(CHANNEL).await.unwrap(), 7);
    let (blocks, total) = ledger.query_blocks(CHANNEL, 20, 0).await.unwrap();
    assert_eq!(total, 7);
    let heights: Vec<i64> = blocks.iter().map(|b| b.height).collect();
    assert_eq!(heights, vec![7, 6, 5, 4, 3, 2, 1]);
}

#[tokio::test]
async fn noop_when_local_matches_tip() {
    let server = mock_node(2).await;
    let ledger = Arc::new(test_ledger().await);
    let crawler = crawler(ledger.clone(), None);

    crawler
        .crawl_channel(CHANNEL, &[server.uri()])
        .await
        .unwrap();
    let (_, total_before) = ledger.query_blocks(CHANNEL, 10, 0).await.unwrap();

    // A second pass against the same tip stores nothing new.
    crawler
        .crawl_channel(CHANNEL, &[server.uri()])
        .await
        .unwrap();
    let (_, total_after) = ledger.query_blocks(CHANNEL, 10, 0).await.unwrap();
    assert_eq!(total_before, total_after);
}

#[tokio::test]
async fn unreachable_channel_fails_the_pass() {
    let ledger = Arc::new(test_ledger().await);
    let crawler = crawler(ledger.clone(), None);

    // No configured nodes is a hard failure.
    assert!(crawler.crawl_channel(CHANNEL, &[]).await.is_err());

    // A server with no RPC mounted answers 404 to everything.
    let server = MockServer::start().await;
    assert!(crawler
        .crawl_channel(CHANNEL, &[server.uri()])
        .await
        .is_err());
    assert_eq!(ledger.current_height(CHANNEL).await.unwrap(), 0);
}

#[tokio::test]
async fn failed_tx_status_is_stored_as_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({ "method": "icx_getLastBlock" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": { "height": 1 } })),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({ "method": "icx_getBlockByHeight" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": block_result(1)
        })))
        .mount(&server)
        .await;

    // First tx confirms, second reverts.
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({
            "method": "icx_getTransactionResult",
            "params": { "txHash": "0xtx000100" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "status": "0x1" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RPC_PATH))
        .and(body_partial_json(json!({ "method": "icx_getTransactionResult" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": { "status": "0x0" }
        })))
        .mount(&server)
        .await;

    let ledger = Arc::new(test_ledger().await);
    let crawler = crawler(ledger.clone(), None);
    crawler
        .crawl_channel(CHANNEL, &[server.uri()])
        .await
        .unwrap();

    let confirmed = ledger
        .query_tx_by_hash(CHANNEL, "0xtx000100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(confirmed.status, "Success");

    let reverted = ledger
        .query_tx_by_hash(CHANNEL, "0xtx000101")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reverted.status, "Failure");
}

#[tokio::test]
async fn synthetic_blocks_ingest_offline() {
    let ledger = Arc::new(test_ledger().await);
    let crawler = crawler(ledger.clone(), None);

    for height in 1..=3 {
        let raw = ingest::synthetic_block(height, 4);
        crawler.ingest_block(CHANNEL, None, &raw).await.unwrap();
    }

    assert_eq!(ledger.current_height(CHANNEL).await.unwrap(), 3);
    assert_eq!(ledger.tx_count(CHANNEL).await.unwrap(), 12);

    // Offline ingestion defaults every status to Success.
    let (txs, _) = ledger
        .query_txs(CHANNEL, 20, 0, &Default::default())
        .await
        .unwrap();
    assert!(txs.iter().all(|tx| tx.status == "Success"));
}
