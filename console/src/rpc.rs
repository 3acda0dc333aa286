//! JSON-RPC client for the chain node API.
//!
//! All calls are HTTP POST against `{uri}/api/v3[/{channel}]`; the channel
//! path segment is omitted for the default channel.

use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::constants::rpc;
use crate::errors::RpcError;

/// Confirmation status of a transaction as reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Failure,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Success => "Success",
            TxStatus::Failure => "Failure",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Success" => TxStatus::Success,
            _ => TxStatus::Failure,
        }
    }
}

#[derive(Clone)]
pub struct ChainRpcClient {
    client: HttpClient,
}

impl ChainRpcClient {
    pub fn new() -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(rpc::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client })
    }

    fn endpoint(node_uri: &str, channel: &str) -> String {
        let mut uri = format!("{}{}", node_uri, rpc::API_PATH);
        if !channel.is_empty() && channel != rpc::DEFAULT_CHANNEL {
            uri.push('/');
            uri.push_str(channel);
        }
        uri
    }

    async fn call(
        &self,
        node_uri: &str,
        channel: &str,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value> {
        let endpoint = Self::endpoint(node_uri, channel);

        let mut body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
        });
        if let Some(params) = params {
            body["params"] = params;
        }

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Unreachable {
                uri: endpoint.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(RpcError::Unreachable {
                uri: endpoint,
                reason: format!("HTTP {}", response.status()),
            }
            .into());
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to decode {} response: {}", method, e))?;

        if let Some(error) = envelope.get("error") {
            if !error.is_null() {
                return Err(anyhow!("{} returned error: {}", method, error));
            }
        }

        match envelope.get("result") {
            Some(result) if !result.is_null() => Ok(result.clone()),
            _ => Err(RpcError::MissingResult {
                method: method.to_string(),
            }
            .into()),
        }
    }

    /// Highest block height known to the node.
    pub async fn get_tip_height(&self, node_uri: &str, channel: &str) -> Result<i64> {
        let result = self.call(node_uri, channel, "icx_getLastBlock", None).await?;
        result["height"]
            .as_i64()
            .ok_or_else(|| anyhow!("No height in last block response from {}", node_uri))
    }

    /// Raw block at the given height. The height argument travels as a
    /// 0x-prefixed hex string.
    pub async fn get_block_by_height(
        &self,
        node_uri: &str,
        channel: &str,
        height: i64,
    ) -> Result<Value> {
        debug!("Fetching block {} in {} from {}", height, channel, node_uri);
        self.call(
            node_uri,
            channel,
            "icx_getBlockByHeight",
            Some(json!({ "height": format!("0x{:x}", height) })),
        )
        .await
    }

    /// Confirmation status for a transaction. Nodes that have not yet
    /// indexed a just-confirmed transaction answer with an error, so the
    /// lookup retries on a fixed attempt budget before surfacing failure.
    pub async fn get_tx_status(
        &self,
        node_uri: &str,
        channel: &str,
        tx_hash: &str,
    ) -> Result<TxStatus> {
        let mut last_error = None;

        for attempt in 1..=rpc::TX_STATUS_ATTEMPTS {
            match self.try_tx_status(node_uri, channel, tx_hash).await {
                Ok(status) => return Ok(status),
                Err(e) => {
                    debug!(
                        "tx status attempt {}/{} for {} failed: {}",
                        attempt,
                        rpc::TX_STATUS_ATTEMPTS,
                        tx_hash,
                        e
                    );
                    last_error = Some(e);
                    sleep(rpc::TX_STATUS_RETRY_DELAY).await;
                }
            }
        }

        warn!(
            "Giving up on tx status for {} after {} attempts",
            tx_hash,
            rpc::TX_STATUS_ATTEMPTS
        );
        if let Some(e) = last_error {
            warn!("Last error: {}", e);
        }
        Err(RpcError::TxStatusExhausted {
            tx_hash: tx_hash.to_string(),
            attempts: rpc::TX_STATUS_ATTEMPTS,
        }
        .into())
    }

    async fn try_tx_status(
        &self,
        node_uri: &str,
        channel: &str,
        tx_hash: &str,
    ) -> Result<TxStatus> {
        let result = self
            .call(
                node_uri,
                channel,
                "icx_getTransactionResult",
                Some(json!({ "txHash": tx_hash })),
            )
            .await?;

        let status = result["status"]
            .as_str()
            .ok_or_else(|| anyhow!("No status in transaction result for {}", tx_hash))?;

        if status == "0x1" {
            Ok(TxStatus::Success)
        } else {
            Ok(TxStatus::Failure)
        }
    }
}
