//! Block crawler: pulls missing blocks for each channel from the chain
//! nodes and persists them through the ledger store.
//!
//! Small backlogs are fetched height by height; large backlogs run in
//! parallel batches bounded by `step` so the number of in-flight RPCs
//! stays near twice the core count.

pub mod ingest;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future::join_all;
use rand::Rng;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::ledger::{BlockRecord, LedgerDb, TxRecord};
use crate::rpc::{ChainRpcClient, TxStatus};

#[derive(Clone)]
pub struct BlockCrawler {
    rpc: ChainRpcClient,
    ledger: Arc<LedgerDb>,
    max_batch_size: Option<usize>,
}

impl BlockCrawler {
    pub fn new(rpc: ChainRpcClient, ledger: Arc<LedgerDb>, max_batch_size: Option<usize>) -> Self {
        Self {
            rpc,
            ledger,
            max_batch_size,
        }
    }

    /// Parallel batch size: one task per height, roughly twice the core
    /// count, optionally capped by configuration.
    fn step(&self) -> i64 {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let step = 2 * cores + 1;
        let step = match self.max_batch_size {
            Some(cap) => step.min(cap.max(1)),
            None => step,
        };
        step as i64
    }

    /// Crawl one channel up to the chain tip. Fails the pass when no node
    /// is reachable or a fetch fails; the next tick resumes from the last
    /// stored height.
    pub async fn crawl_channel(&self, channel: &str, nodes: &[String]) -> Result<()> {
        if nodes.is_empty() {
            return Err(anyhow!("no nodes configured for channel {}", channel));
        }

        let local = self.ledger.current_height(channel).await?;

        // Tip lookup tries nodes in configured order.
        let mut tip = None;
        for node in nodes {
            match self.rpc.get_tip_height(node, channel).await {
                Ok(height) => {
                    tip = Some(height);
                    break;
                }
                Err(e) => warn!("Tip lookup on {} failed for {}: {}", node, channel, e),
            }
        }
        let tip = tip.ok_or_else(|| anyhow!("no reachable node in channel {}", channel))?;

        if tip <= local {
            debug!("No crawl needed in {} (local {}, tip {})", channel, local, tip);
            return Ok(());
        }

        info!(
            "Crawling blocks {} to {} in {} ({} behind)",
            local + 1,
            tip,
            channel,
            tip - local
        );
        self.crawl_range(channel, nodes, local + 1, tip).await
    }

    async fn crawl_range(
        &self,
        channel: &str,
        nodes: &[String],
        begin: i64,
        end: i64,
    ) -> Result<()> {
        let step = self.step();
        let range = end - begin + 1;

        // Small backlogs are cheaper fetched one by one.
        if range < step {
            return self.crawl_linear(channel, nodes, begin, end).await;
        }

        let mut height = begin;
        while height + step - 1 <= end {
            self.crawl_batch(channel, nodes, height, height + step - 1)
                .await?;
            height += step;
        }

        if height <= end {
            debug!("Remainder {} to {} in {}", height, end, channel);
            self.crawl_linear(channel, nodes, height, end).await?;
        }

        Ok(())
    }

    async fn crawl_linear(
        &self,
        channel: &str,
        nodes: &[String],
        begin: i64,
        end: i64,
    ) -> Result<()> {
        for height in begin..=end {
            let node = pick_node(nodes);
            self.fetch_and_store(channel, node, height).await?;
        }
        Ok(())
    }

    /// One task per height, joined before the next batch starts. A failed
    /// fetch does not abort its siblings but fails the pass once the
    /// batch has joined.
    async fn crawl_batch(
        &self,
        channel: &str,
        nodes: &[String],
        begin: i64,
        end: i64,
    ) -> Result<()> {
        let mut tasks = Vec::with_capacity((end - begin + 1) as usize);
        for height in begin..=end {
            let crawler = self.clone();
            let channel = channel.to_string();
            let node = pick_node(nodes).to_string();
            tasks.push(tokio::spawn(async move {
                crawler.fetch_and_store(&channel, &node, height).await
            }));
        }

        let mut failed = 0usize;
        let total = tasks.len();
        for result in join_all(tasks).await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Fetch failed in batch for {}: {}", channel, e);
                    failed += 1;
                }
                Err(e) => {
                    error!("Fetch task panicked for {}: {}", channel, e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(anyhow!(
                "{} of {} fetches failed in batch {}..{} of {}",
                failed,
                total,
                begin,
                end,
                channel
            ));
        }
        Ok(())
    }

    async fn fetch_and_store(&self, channel: &str, node_uri: &str, height: i64) -> Result<()> {
        let raw = self.rpc.get_block_by_height(node_uri, channel, height).await?;
        self.ingest_block(channel, Some(node_uri), &raw).await?;
        Ok(())
    }

    /// Ingest a raw block result. With a node URI, each transaction's
    /// confirmation status is resolved over RPC; without one (synthetic
    /// ingestion) statuses default to Success.
    pub async fn ingest_block(
        &self,
        channel: &str,
        node_uri: Option<&str>,
        raw: &Value,
    ) -> Result<()> {
        let parsed = ingest::parse_block(raw)?;
        debug!(
            "Ingesting block {} in {} ({} txs) {}",
            parsed.height,
            channel,
            parsed.transactions.len(),
            parsed.block_hash
        );

        let mut transactions = Vec::with_capacity(parsed.transactions.len());
        for tx in &parsed.transactions {
            let status = match node_uri {
                Some(uri) => self.rpc.get_tx_status(uri, channel, &tx.tx_hash).await?,
                None => TxStatus::Success,
            };
            transactions.push(TxRecord {
                tx_hash: tx.tx_hash.clone(),
                status: status.as_str().to_string(),
                channel: channel.to_string(),
                block_height: parsed.height,
                timestamp: tx.timestamp,
                sender: tx.sender.clone(),
                recipient: tx.recipient.clone(),
                payload: tx.payload.clone(),
            });
        }

        let block = BlockRecord {
            channel: channel.to_string(),
            height: parsed.height,
            peer_id: parsed.peer_id,
            signature: parsed.signature,
            timestamp: parsed.timestamp,
            block_hash: parsed.block_hash,
            transactions,
        };

        self.ledger.append_block(&block).await
    }
}

fn pick_node(nodes: &[String]) -> &str {
    if nodes.len() == 1 {
        return &nodes[0];
    }
    let index = rand::thread_rng().gen_range(0..nodes.len());
    &nodes[index]
}
