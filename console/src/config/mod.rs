pub mod manager;
pub mod store;

use serde::{Deserialize, Serialize};

pub use manager::ConfigManager;
pub use store::ThresholdStore;

use crate::constants::{alerts, intervals, metrics};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chain: ChainConfig,
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// SQLite file backing the ledger store
    pub db_path: String,
    #[serde(default = "default_crawl_interval")]
    pub crawl_interval_secs: u64,
    /// Optional cap on the parallel fetch batch size
    pub max_batch_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub backend_url: String,
    #[serde(default = "default_query_path")]
    pub query_path: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    pub node_kind: NodeKind,
    /// Metric name prefix, required for goloop deployments
    pub job_name: Option<String>,
}

/// Which node software emits the metrics this deployment scrapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Loopchain,
    Goloop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    /// Base URI of the node's RPC endpoint, e.g. "http://10.0.0.5:9000"
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    /// Stable identity key recorded on symptoms
    pub key: String,
    /// Hex network id carried on goloop metrics, e.g. "0x1"
    pub chain_id: Option<String>,
    pub nodes: Vec<String>,
    pub alerts: Option<AlertThresholds>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlertThresholds {
    #[serde(default = "default_unsync_tolerance")]
    pub unsync_tolerance_secs: u64,
    #[serde(default = "default_slow_response")]
    pub slow_response_secs: u64,
    #[serde(default = "default_unsync_block_gap")]
    pub unsync_block_gap: u64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            unsync_tolerance_secs: alerts::DEFAULT_UNSYNC_TOLERANCE_SECS,
            slow_response_secs: alerts::DEFAULT_SLOW_RESPONSE_SECS,
            unsync_block_gap: alerts::DEFAULT_UNSYNC_BLOCK_GAP,
        }
    }
}

fn default_crawl_interval() -> u64 {
    intervals::DEFAULT_CRAWL_SECS
}

fn default_poll_interval() -> u64 {
    intervals::DEFAULT_POLL_SECS
}

fn default_query_path() -> String {
    metrics::DEFAULT_QUERY_PATH.to_string()
}

fn default_unsync_tolerance() -> u64 {
    alerts::DEFAULT_UNSYNC_TOLERANCE_SECS
}

fn default_slow_response() -> u64 {
    alerts::DEFAULT_SLOW_RESPONSE_SECS
}

fn default_unsync_block_gap() -> u64 {
    alerts::DEFAULT_UNSYNC_BLOCK_GAP
}

impl Config {
    /// Node addresses for a channel, in configured order.
    pub fn channel_nodes(&self, channel: &str) -> Vec<String> {
        let Some(ch) = self.channels.iter().find(|c| c.name == channel) else {
            return Vec::new();
        };
        ch.nodes
            .iter()
            .filter_map(|name| self.node_address(name))
            .map(str::to_string)
            .collect()
    }

    pub fn node_address(&self, name: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.address.as_str())
    }

    /// Resolve a metric hostname to a node name by substring match against
    /// the configured addresses.
    pub fn node_name_by_host(&self, host: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.address.contains(host))
            .map(|n| n.name.as_str())
    }

    /// Resolve a goloop hex network id to a channel name.
    pub fn channel_name_by_chain_id(&self, chain_id: &str) -> Option<&str> {
        self.channels
            .iter()
            .find(|c| c.chain_id.as_deref() == Some(chain_id))
            .map(|c| c.name.as_str())
    }

    pub fn channel_key(&self, channel: &str) -> Option<&str> {
        self.channels
            .iter()
            .find(|c| c.name == channel)
            .map(|c| c.key.as_str())
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }
}
