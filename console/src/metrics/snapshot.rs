//! Process-wide holder of the most recent health classification.
//!
//! Single writer (the metrics scheduler), many readers (the API layer).
//! Every poll replaces the value wholesale; the sequence number lets
//! readers detect staleness across overlapping polls.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use super::{ChannelHealth, HealthSnapshot, PollStatus};

#[derive(Default)]
pub struct HealthSnapshotStore {
    inner: RwLock<Option<HealthSnapshot>>,
    seq: AtomicU64,
}

impl HealthSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held snapshot, stamping a monotonic sequence number.
    pub async fn replace(&self, mut snapshot: HealthSnapshot) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        snapshot.seq = seq;
        *self.inner.write().await = Some(snapshot);
        seq
    }

    /// Latest snapshot of any status, or None when no poll has completed
    /// yet ("not yet available").
    pub async fn latest(&self) -> Option<HealthSnapshot> {
        self.inner.read().await.clone()
    }

    /// Latest snapshot only if the most recent poll succeeded. Hysteresis
    /// carry-over and per-channel reads go through here so a failed or
    /// warming poll never serves stale node data.
    pub async fn latest_success(&self) -> Option<HealthSnapshot> {
        self.inner
            .read()
            .await
            .clone()
            .filter(|s| s.status == PollStatus::Success)
    }

    pub async fn channel(&self, name: &str) -> Option<ChannelHealth> {
        self.latest_success()
            .await
            .and_then(|s| s.channels.into_iter().find(|c| c.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ChannelStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn starts_not_yet_available() {
        let store = HealthSnapshotStore::new();
        assert!(store.latest().await.is_none());
        assert!(store.channel("payments").await.is_none());
    }

    #[tokio::test]
    async fn replace_stamps_monotonic_seq() {
        let store = HealthSnapshotStore::new();
        let first = store.replace(HealthSnapshot::failed()).await;
        let second = store.replace(HealthSnapshot::warming()).await;
        assert!(second > first);
        assert_eq!(store.latest().await.unwrap().seq, second);
    }

    #[tokio::test]
    async fn channel_reads_require_a_successful_poll() {
        let store = HealthSnapshotStore::new();
        let channels = vec![ChannelHealth {
            name: "payments".to_string(),
            status: ChannelStatus::Normal,
            nodes: Vec::new(),
        }];
        store
            .replace(HealthSnapshot::ready(Utc::now(), channels))
            .await;
        assert!(store.channel("payments").await.is_some());

        // A failed poll replaces the snapshot wholesale.
        store.replace(HealthSnapshot::failed()).await;
        assert!(store.channel("payments").await.is_none());
        assert!(store.latest().await.is_some());
    }
}
