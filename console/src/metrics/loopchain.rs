//! Metrics parser for loopchain nodes.
//!
//! Loopchain exporters label every series with the channel and node alias
//! directly, so no inventory resolution is needed.

use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use tracing::{debug, info};

use crate::config::MetricsConfig;
use crate::constants::metrics;
use crate::errors::MetricsError;

use super::backend;
use super::{node_entry, ChannelSamples, PollOutcome};

const METRIC_NAMES: [&str; 5] = [
    "block_height",
    "tx_count",
    "unconfirmed_tx_count",
    "is_leader",
    "response_time",
];

pub struct LoopchainPoller {
    client: HttpClient,
    backend_url: String,
    query_path: String,
}

impl LoopchainPoller {
    pub fn new(config: &MetricsConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(metrics::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            backend_url: config.backend_url.clone(),
            query_path: config.query_path.clone(),
        })
    }

    pub async fn poll(&self) -> Result<PollOutcome> {
        let names: Vec<String> = METRIC_NAMES.iter().map(|n| n.to_string()).collect();
        let series =
            backend::range_query(&self.client, &self.backend_url, &self.query_path, &names)
                .await?;

        if series.is_empty() {
            return Err(MetricsError::EmptyResult.into());
        }

        // A single point means the backend has no history yet.
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
            let channel = s.metric.channel.as_deref().ok_or_else(|| {
                MetricsError::BadSample {
                    metric: s.metric.name.clone(),
                    reason: "missing channel label".to_string(),
                }
            })?;
            let node = s.metric.alias.as_deref().ok_or_else(|| {
                MetricsError::BadSample {
                    metric: s.metric.name.clone(),
                    reason: "missing alias label".to_string(),
                }
            })?;

            let entry = node_entry(&mut channels, channel, node);
            match s.metric.name.as_str() {
                "block_height" => {
                    entry.block_height = s.latest_u64()?;
                    entry.window_start_height = s.first_u64()?;
                }
                "tx_count" => entry.tx_count = s.latest_u64()?,
                "unconfirmed_tx_count" => entry.unconfirmed_tx_count = s.latest_u64()?,
                "is_leader" => entry.is_leader = s.latest_u64()? != 0,
                "response_time" => entry.response_time_secs = s.latest_f64()?,
                other => debug!("Ignoring unexpected metric {}", other),
            }
        }

        if channels.is_empty() {
            return Err(MetricsError::EmptyResult.into());
        }

        Ok(PollOutcome::Ready { channels, taken_at })
    }
}
