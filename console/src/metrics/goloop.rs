//! Metrics parser for goloop nodes.
//!
//! Goloop exporters prefix metric names with the scrape job and label
//! series with a numeric network id and a bare hostname; both must be
//! resolved against the configured inventory, and a failed resolution is
//! a hard error for the poll.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use tracing::{debug, info};

use crate::config::Config;
use crate::constants::metrics;
use crate::errors::MetricsError;

use super::backend;
use super::{node_entry, ChannelSamples, PollOutcome};

const METRIC_SUFFIXES: [&str; 4] = [
    "consensus_height",
    "txpool_user_remove_sum",
    "txpool_user_drop_sum",
    "consensus_height_duration",
];

pub struct GoloopPoller {
    client: HttpClient,
    backend_url: String,
    query_path: String,
    job_name: String,
    config: Arc<Config>,
}

impl GoloopPoller {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let job_name = config
            .metrics
            .job_name
            .clone()
            .ok_or_else(|| anyhow!("goloop deployments require metrics.job_name"))?;

        let client = HttpClient::builder()
            .timeout(metrics::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            backend_url: config.metrics.backend_url.clone(),
            query_path: config.metrics.query_path.clone(),
            job_name,
            config,
        })
    }

    fn metric_names(&self) -> Vec<String> {
        METRIC_SUFFIXES
            .iter()
            .map(|suffix| format!("{}_{}", self.job_name, suffix))
            .collect()
    }

    pub async fn poll(&self) -> Result<PollOutcome> {
        let names = self.metric_names();
        let series =
            backend::range_query(&self.client, &self.backend_url, &self.query_path, &names)
                .await?;

        if series.is_empty() {
            return Err(MetricsError::EmptyResult.into());
        }

        if series[0].values.len() == 1 {
            info!("Metrics backend warming up, no history to classify yet");
            return Ok(PollOutcome::Warming);
        }

        let taken_at = backend::latest_timestamp(&series).ok_or_else(|| {
            MetricsError::Backend {
                reason: "series carry no sample points".to_string(),
            }
        })?;

        let mut channels: Vec<ChannelSamples> = Vec::new();
        for s in &series {
            let channel_label = s.metric.channel.as_deref().ok_or_else(|| {
                MetricsError::BadSample {
                    metric: s.metric.name.clone(),
                    reason: "missing channel label".to_string(),
                }
            })?;
            let chain_id = format!("0x{}", channel_label);
            let channel = self
                .config
                .channel_name_by_chain_id(&chain_id)
                .ok_or(MetricsError::UnknownChannel { id: chain_id })?;

            let host = s.metric.hostname.as_deref().ok_or_else(|| {
                MetricsError::BadSample {
                    metric: s.metric.name.clone(),
                    reason: "missing hostname label".to_string(),
                }
            })?;
            let node = self
                .config
                .node_name_by_host(host)
                .ok_or_else(|| MetricsError::UnknownNode {
                    host: host.to_string(),
                })?;

            let entry = node_entry(&mut channels, channel, node);
            // Leadership is not exported by goloop.
            entry.is_leader = false;

            match &s.metric.name {
                name if *name == names[0] => {
                    entry.block_height = s.latest_u64()?;
                    entry.window_start_height = s.first_u64()?;
                }
                name if *name == names[1] => entry.tx_count = s.latest_u64()?,
                name if *name == names[2] => entry.unconfirmed_tx_count = s.latest_u64()?,
                name if *name == names[3] => {
                    // Exported in milliseconds.
                    entry.response_time_secs = s.latest_u64()? as f64 / 1000.0;
                }
                other => debug!("Ignoring unexpected metric {}", other),
            }
        }

        if channels.is_empty() {
            return Err(MetricsError::EmptyResult.into());
        }

        Ok(PollOutcome::Ready { channels, taken_at })
    }
}
