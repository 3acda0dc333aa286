//! Periodic runners for the block crawl and metrics poll pipelines.
//!
//! Both are fixed-interval `tokio::time::interval` loops. The crawl loop
//! enforces single-flight with an explicit atomic guard: a tick arriving
//! while a pass is still running is logged and dropped, never queued. The
//! metrics loop awaits each poll inline, so polls cannot overlap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, ThresholdStore};
use crate::crawler::BlockCrawler;
use crate::ledger::LedgerDb;
use crate::metrics::classify::classify_channel;
use crate::metrics::{HealthSnapshot, HealthSnapshotStore, MetricsPoller, PollOutcome};

pub struct CrawlScheduler {
    crawler: BlockCrawler,
    config: Arc<Config>,
    running: Arc<AtomicBool>,
}

impl CrawlScheduler {
    pub fn new(crawler: BlockCrawler, config: Arc<Config>) -> Self {
        Self {
            crawler,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claim the single-flight slot. False means a pass is already
    /// running and this tick must be dropped.
    fn try_begin(&self) -> bool {
        !self.running.swap(true, Ordering::SeqCst)
    }

    pub async fn run(self) {
        let period = Duration::from_secs(self.config.chain.crawl_interval_secs);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            "Block crawl scheduler started with {}s interval",
            self.config.chain.crawl_interval_secs
        );

        loop {
            ticker.tick().await;
            self.tick();
        }
    }

    fn tick(&self) {
        if !self.try_begin() {
            info!("Crawl pass still running, skipping tick");
            return;
        }

        let crawler = self.crawler.clone();
        let config = self.config.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            let pass_id = Uuid::new_v4();
            debug!("Starting crawl pass {}", pass_id);

            // Channels crawl sequentially; one channel's failure never
            // aborts its siblings or the process.
            for channel in &config.channels {
                let nodes = config.channel_nodes(&channel.name);
                if let Err(e) = crawler.crawl_channel(&channel.name, &nodes).await {
                    error!(
                        "Crawl pass {} failed for channel {}: {}",
                        pass_id, channel.name, e
                    );
                }
            }

            debug!("Crawl pass {} finished", pass_id);
            running.store(false, Ordering::SeqCst);
        });
    }
}

pub struct MetricsScheduler {
    poller: MetricsPoller,
    config: Arc<Config>,
    thresholds: Arc<ThresholdStore>,
    snapshot: Arc<HealthSnapshotStore>,
    ledger: Arc<LedgerDb>,
}

impl MetricsScheduler {
    pub fn new(
        poller: MetricsPoller,
        config: Arc<Config>,
        thresholds: Arc<ThresholdStore>,
        snapshot: Arc<HealthSnapshotStore>,
        ledger: Arc<LedgerDb>,
    ) -> Self {
        Self {
            poller,
            config,
            thresholds,
            snapshot,
            ledger,
        }
    }

    pub async fn run(self) {
        let period = Duration::from_secs(self.config.metrics.poll_interval_secs);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            "Metrics poll scheduler started with {}s interval",
            self.config.metrics.poll_interval_secs
        );

        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                error!("Metrics poll cycle failed: {}", e);
            }
        }
    }

    /// One poll cycle. Every outcome, including failure and warming,
    /// replaces the published snapshot with an explicit status tag.
    pub async fn poll_once(&self) -> Result<()> {
        let outcome = match self.poller.poll().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Metrics poll failed: {}", e);
                self.snapshot.replace(HealthSnapshot::failed()).await;
                return Ok(());
            }
        };

        let (channels, taken_at) = match outcome {
            PollOutcome::Warming => {
                self.snapshot.replace(HealthSnapshot::warming()).await;
                return Ok(());
            }
            PollOutcome::Ready { channels, taken_at } => (channels, taken_at),
        };

        // Hysteresis state carries over only from a successful snapshot.
        let previous = self.snapshot.latest_success().await;

        let mut classified = Vec::with_capacity(channels.len());
        for samples in &channels {
            // Thresholds are read fresh: operators may change them
            // between polls.
            let thresholds = self.thresholds.get(&samples.name).await;
            let prev_channel = previous
                .as_ref()
                .and_then(|s| s.channels.iter().find(|c| c.name == samples.name));

            let (health, events) = classify_channel(
                samples,
                prev_channel,
                &thresholds,
                self.config.metrics.poll_interval_secs,
            );

            for event in events {
                info!(
                    target: "symptom",
                    "[{}][{}] {}",
                    event.channel,
                    event.kind.as_str(),
                    event.message
                );
                let channel_key = self
                    .config
                    .channel_key(&event.channel)
                    .unwrap_or_default()
                    .to_string();
                if let Err(e) = self
                    .ledger
                    .append_symptom(&event.channel, &channel_key, event.kind, &event.message)
                    .await
                {
                    error!("Failed to record symptom for {}: {}", event.channel, e);
                }
            }

            debug!(
                "Classified channel {} as {:?}",
                health.name, health.status
            );
            classified.push(health);
        }

        self.snapshot
            .replace(HealthSnapshot::ready(taken_at, classified))
            .await;
        Ok(())
    }
}
