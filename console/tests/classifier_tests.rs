//! Health classifier behavior: unsync hysteresis, immediate slow-response
//! classification, and channel aggregation.

use console::config::AlertThresholds;
use console::ledger::SymptomKind;
use console::metrics::classify::classify_channel;
use console::metrics::{ChannelHealth, ChannelSamples, ChannelStatus, NodeSample, NodeStatus};

const POLL_INTERVAL_SECS: u64 = 5;

fn thresholds() -> AlertThresholds {
    // The documented defaults: 360s unsync tolerance, 5s slow response,
    // 100 block gap.
    AlertThresholds::default()
}

fn node(name: &str, height: u64, window_start: u64, response_secs: f64) -> NodeSample {
    NodeSample {
        name: name.to_string(),
        block_height: height,
        window_start_height: window_start,
        response_time_secs: response_secs,
        ..Default::default()
    }
}

fn channel(nodes: Vec<NodeSample>) -> ChannelSamples {
    ChannelSamples {
        name: "payments".to_string(),
        nodes,
    }
}

fn classify(
    samples: &ChannelSamples,
    previous: Option<&ChannelHealth>,
) -> (ChannelHealth, Vec<console::metrics::classify::SymptomEvent>) {
    classify_channel(samples, previous, &thresholds(), POLL_INTERVAL_SECS)
}

#[test]
fn advancing_nodes_are_normal() {
    let samples = channel(vec![
        node("node0", 110, 100, 0.2),
        node("node1", 108, 99, 0.3),
    ]);
    let (health, events) = classify(&samples, None);

    assert_eq!(health.status, ChannelStatus::Normal);
    assert!(events.is_empty());
    for n in &health.nodes {
        assert_eq!(n.status, NodeStatus::Normal);
        assert_eq!(n.unsync_hold_secs, 0);
    }
}

#[test]
fn first_stalled_poll_seeds_the_hold_floor() {
    // Stalled within the window, but 60s of hold is under the 360s
    // tolerance: no flag yet.
    let samples = channel(vec![node("node0", 100, 100, 0.1)]);
    let (health, events) = classify(&samples, None);

    assert_eq!(health.nodes[0].status, NodeStatus::Normal);
    assert_eq!(health.nodes[0].unsync_hold_secs, 60);
    assert!(events.is_empty());
}

#[test]
fn alternating_unsync_never_reaches_the_threshold() {
    let mut previous: Option<ChannelHealth> = None;
    let mut height = 100u64;

    for poll in 0..200 {
        // Every other poll the node advances, resetting the hold.
        if poll % 2 == 1 {
            height += 1;
        }
        let samples = channel(vec![node("node0", height, height, 0.1)]);
        let (health, events) = classify(&samples, previous.as_ref());

        assert_eq!(health.nodes[0].status, NodeStatus::Normal);
        assert!(events.is_empty());
        assert!(health.nodes[0].unsync_hold_secs <= 60);
        previous = Some(health);
    }
}

#[test]
fn continuous_unsync_flags_only_after_the_tolerance() {
    // 360s tolerance, 5s interval: hold runs 60, 66, 72, ... and first
    // exceeds 360 on poll 52.
    let mut previous: Option<ChannelHealth> = None;

    for poll in 1..=60 {
        let samples = channel(vec![node("node0", 100, 100, 0.1)]);
        let (health, events) = classify(&samples, previous.as_ref());

        let expected_hold = 60 + (poll - 1) * (POLL_INTERVAL_SECS + 1);
        assert_eq!(health.nodes[0].unsync_hold_secs, expected_hold);

        if expected_hold > 360 {
            assert_eq!(health.nodes[0].status, NodeStatus::UnsyncedBlock, "poll {}", poll);
            assert_eq!(health.status, ChannelStatus::Abnormal);
            // A symptom fires every tick the node stays above threshold.
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, SymptomKind::UnsyncBlock);
        } else {
            assert_eq!(health.nodes[0].status, NodeStatus::Normal, "poll {}", poll);
            assert!(events.is_empty());
        }

        previous = Some(health);
    }
}

#[test]
fn recovery_resets_the_hold_to_zero() {
    let samples = channel(vec![node("node0", 100, 100, 0.1)]);
    let (stalled, _) = classify(&samples, None);
    assert_eq!(stalled.nodes[0].unsync_hold_secs, 60);

    // The node advances: hold drops straight to zero, not gradually.
    let samples = channel(vec![node("node0", 105, 100, 0.1)]);
    let (recovered, _) = classify(&samples, Some(&stalled));
    assert_eq!(recovered.nodes[0].unsync_hold_secs, 0);
    assert_eq!(recovered.nodes[0].status, NodeStatus::Normal);
}

#[test]
fn trailing_the_channel_head_counts_as_unsync() {
    // node1 advances but sits more than 100 blocks behind node0.
    let samples = channel(vec![
        node("node0", 500, 490, 0.1),
        node("node1", 380, 370, 0.1),
    ]);
    let (health, _) = classify(&samples, None);

    assert_eq!(health.nodes[0].unsync_hold_secs, 0);
    assert_eq!(health.nodes[1].unsync_hold_secs, 60);
}

#[test]
fn slow_response_is_immediate_and_clears_immediately() {
    // One above-threshold sample flags the node at once.
    let samples = channel(vec![node("node0", 110, 100, 7.5)]);
    let (slow, events) = classify(&samples, None);
    assert_eq!(slow.nodes[0].status, NodeStatus::SlowResponse);
    assert_eq!(slow.status, ChannelStatus::Abnormal);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, SymptomKind::SlowResponse);
    assert!(events[0].message.contains("node0"));

    // One below-threshold sample clears it just as fast.
    let samples = channel(vec![node("node0", 120, 110, 0.4)]);
    let (recovered, events) = classify(&samples, Some(&slow));
    assert_eq!(recovered.nodes[0].status, NodeStatus::Normal);
    assert!(events.is_empty());
}

#[test]
fn unsynced_and_slow_combine() {
    // Drive the hold over the tolerance first.
    let mut previous: Option<ChannelHealth> = None;
    for _ in 0..55 {
        let samples = channel(vec![node("node0", 100, 100, 0.1)]);
        let (health, _) = classify(&samples, previous.as_ref());
        previous = Some(health);
    }
    assert_eq!(
        previous.as_ref().unwrap().nodes[0].status,
        NodeStatus::UnsyncedBlock
    );

    // Now the same node also answers slowly.
    let samples = channel(vec![node("node0", 100, 100, 9.0)]);
    let (health, events) = classify(&samples, previous.as_ref());
    assert_eq!(
        health.nodes[0].status,
        NodeStatus::UnsyncedBlockAndSlowResponse
    );
    let kinds: Vec<SymptomKind> = events.iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&SymptomKind::UnsyncBlock));
    assert!(kinds.contains(&SymptomKind::SlowResponse));
}

#[test]
fn one_bad_node_marks_the_channel_abnormal() {
    let samples = channel(vec![
        node("node0", 110, 100, 0.1),
        node("node1", 110, 100, 6.1),
    ]);
    let (health, _) = classify(&samples, None);

    assert_eq!(health.nodes[0].status, NodeStatus::Normal);
    assert_eq!(health.nodes[1].status, NodeStatus::SlowResponse);
    assert_eq!(health.status, ChannelStatus::Abnormal);
}

#[test]
fn tighter_thresholds_apply_on_the_next_evaluation() {
    let samples = channel(vec![node("node0", 110, 100, 2.0)]);
    let (health, _) = classify_channel(&samples, None, &thresholds(), POLL_INTERVAL_SECS);
    assert_eq!(health.nodes[0].status, NodeStatus::Normal);

    // An operator lowering the response threshold takes effect without
    // any carried state.
    let mut tight = thresholds();
    tight.slow_response_secs = 1;
    let (health, _) = classify_channel(&samples, None, &tight, POLL_INTERVAL_SECS);
    assert_eq!(health.nodes[0].status, NodeStatus::SlowResponse);
}
