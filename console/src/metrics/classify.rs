//! Threshold-and-hysteresis health classification.
//!
//! Pure: output depends only on the new samples, the previous channel
//! snapshot, and the thresholds passed in. The unsync condition must hold
//! for an accumulated duration before a node is flagged; slow response is
//! evaluated fresh every tick.

use crate::config::AlertThresholds;
use crate::constants::metrics;
use crate::ledger::SymptomKind;

use super::{ChannelHealth, ChannelSamples, ChannelStatus, NodeHealth, NodeStatus};

/// A threshold breach to be recorded as a symptom.
#[derive(Debug, Clone)]
pub struct SymptomEvent {
    pub channel: String,
    pub kind: SymptomKind,
    pub message: String,
}

/// Classify one channel's samples. `previous` is the channel's entry in
/// the last successful snapshot; it carries the unsync hold counter and
/// the height each node reported last poll.
pub fn classify_channel(
    samples: &ChannelSamples,
    previous: Option<&ChannelHealth>,
    thresholds: &AlertThresholds,
    poll_interval_secs: u64,
) -> (ChannelHealth, Vec<SymptomEvent>) {
    let max_height = samples
        .nodes
        .iter()
        .map(|n| n.block_height)
        .max()
        .unwrap_or(0);

    let mut nodes = Vec::with_capacity(samples.nodes.len());
    let mut events = Vec::new();

    for sample in &samples.nodes {
        let prev_node =
            previous.and_then(|p| p.nodes.iter().find(|n| n.name == sample.name));

        // Nodes absent from the previous snapshot fall back to the height
        // at the start of the query window, so a first poll never
        // self-triggers the stall test.
        let prev_height = prev_node
            .map(|n| n.block_height)
            .unwrap_or(sample.window_start_height);
        let prev_hold = prev_node.map(|n| n.unsync_hold_secs).unwrap_or(0);

        let stalled = sample.block_height == prev_height;
        let trailing =
            max_height.saturating_sub(sample.block_height) > thresholds.unsync_block_gap;

        let unsync_hold_secs = if stalled || trailing {
            if prev_hold == 0 {
                metrics::UNSYNC_HOLD_FLOOR_SECS
            } else {
                prev_hold + poll_interval_secs + 1
            }
        } else {
            0
        };

        let mut status = NodeStatus::Normal;
        if unsync_hold_secs > thresholds.unsync_tolerance_secs {
            status = NodeStatus::UnsyncedBlock;
            events.push(SymptomEvent {
                channel: samples.name.clone(),
                kind: SymptomKind::UnsyncBlock,
                message: format!(
                    "[{}] block height [{}] is unsync [{}]",
                    sample.name, sample.block_height, max_height
                ),
            });
        }

        if sample.response_time_secs > thresholds.slow_response_secs as f64 {
            status = if status == NodeStatus::UnsyncedBlock {
                NodeStatus::UnsyncedBlockAndSlowResponse
            } else {
                NodeStatus::SlowResponse
            };
            events.push(SymptomEvent {
                channel: samples.name.clone(),
                kind: SymptomKind::SlowResponse,
                message: format!(
                    "[{}] response time [{:.3}s] over threshold",
                    sample.name, sample.response_time_secs
                ),
            });
        }

        nodes.push(NodeHealth {
            name: sample.name.clone(),
            block_height: sample.block_height,
            prev_block_height: prev_height,
            tx_count: sample.tx_count,
            unconfirmed_tx_count: sample.unconfirmed_tx_count,
            response_time_secs: sample.response_time_secs,
            is_leader: sample.is_leader,
            status,
            unsync_hold_secs,
        });
    }

    let status = if nodes.iter().any(|n| !n.status.is_normal()) {
        ChannelStatus::Abnormal
    } else {
        ChannelStatus::Normal
    };

    (
        ChannelHealth {
            name: samples.name.clone(),
            status,
            nodes,
        },
        events,
    )
}
