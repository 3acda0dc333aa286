//! Metrics polling and health classification.
//!
//! Two poller variants, one per node software, share a common sample
//! shape; a pure classifier turns samples plus the previous snapshot into
//! per-node and per-channel status.
//!
//! Submodules:
//! - `backend` - range-vector queries against the metrics backend
//! - `loopchain` / `goloop` - schema parsers, one per node software
//! - `classify` - threshold-and-hysteresis status classification
//! - `snapshot` - process-wide holder of the latest classification

pub mod backend;
pub mod classify;
pub mod goloop;
pub mod loopchain;
pub mod snapshot;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use goloop::GoloopPoller;
pub use loopchain::LoopchainPoller;
pub use snapshot::HealthSnapshotStore;

/// Classified status of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Normal,
    UnsyncedBlock,
    SlowResponse,
    UnsyncedBlockAndSlowResponse,
}

impl NodeStatus {
    pub fn is_normal(&self) -> bool {
        matches!(self, NodeStatus::Normal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    Normal,
    Abnormal,
}

/// Outcome tag carried on every published snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollStatus {
    Success,
    Failed,
    Warming,
}

/// Raw per-node sample parsed from the backend, before classification.
#[derive(Debug, Clone, Default)]
pub struct NodeSample {
    pub name: String,
    pub block_height: u64,
    /// First height observed in the query window, the stall fallback for
    /// nodes absent from the previous snapshot.
    pub window_start_height: u64,
    pub tx_count: u64,
    pub unconfirmed_tx_count: u64,
    pub response_time_secs: f64,
    pub is_leader: bool,
}

#[derive(Debug, Clone)]
pub struct ChannelSamples {
    pub name: String,
    pub nodes: Vec<NodeSample>,
}

/// What one poll produced. `Warming` means the backend answered but has
/// not accumulated enough history to classify against.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Ready {
        channels: Vec<ChannelSamples>,
        taken_at: DateTime<Utc>,
    },
    Warming,
}

/// Classified per-node health as published in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHealth {
    pub name: String,
    pub block_height: u64,
    pub prev_block_height: u64,
    pub tx_count: u64,
    pub unconfirmed_tx_count: u64,
    pub response_time_secs: f64,
    pub is_leader: bool,
    pub status: NodeStatus,
    /// Seconds the unsync condition has held; carried across polls, reset
    /// to zero the instant the condition clears.
    pub unsync_hold_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelHealth {
    pub name: String,
    pub status: ChannelStatus,
    pub nodes: Vec<NodeHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: PollStatus,
    pub taken_at: Option<DateTime<Utc>>,
    /// Monotonic replacement counter; readers compare it to detect
    /// staleness across overlapping polls.
    pub seq: u64,
    pub channels: Vec<ChannelHealth>,
}

impl HealthSnapshot {
    pub fn ready(taken_at: DateTime<Utc>, channels: Vec<ChannelHealth>) -> Self {
        Self {
            status: PollStatus::Success,
            taken_at: Some(taken_at),
            seq: 0,
            channels,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: PollStatus::Failed,
            taken_at: None,
            seq: 0,
            channels: Vec::new(),
        }
    }

    pub fn warming() -> Self {
        Self {
            status: PollStatus::Warming,
            taken_at: None,
            seq: 0,
            channels: Vec::new(),
        }
    }
}

/// Find-or-insert a node's sample slot, creating the channel entry on
/// first sight. Both schema parsers accumulate series this way.
pub(crate) fn node_entry<'a>(
    channels: &'a mut Vec<ChannelSamples>,
    channel: &str,
    node: &str,
) -> &'a mut NodeSample {
    let channel_index = match channels.iter().position(|c| c.name == channel) {
        Some(index) => index,
        None => {
            channels.push(ChannelSamples {
                name: channel.to_string(),
                nodes: Vec::new(),
            });
            channels.len() - 1
        }
    };

    let entry = &mut channels[channel_index];
    let node_index = match entry.nodes.iter().position(|n| n.name == node) {
        Some(index) => index,
        None => {
            entry.nodes.push(NodeSample {
                name: node.to_string(),
                ..Default::default()
            });
            entry.nodes.len() - 1
        }
    };

    &mut entry.nodes[node_index]
}

/// Poller dispatch over the two supported metric schemas.
pub enum MetricsPoller {
    Loopchain(LoopchainPoller),
    Goloop(GoloopPoller),
}

impl MetricsPoller {
    pub async fn poll(&self) -> Result<PollOutcome> {
        match self {
            MetricsPoller::Loopchain(poller) => poller.poll().await,
            MetricsPoller::Goloop(poller) => poller.poll().await,
        }
    }
}
