//! Runtime-mutable per-channel alert thresholds.
//!
//! Operators may change thresholds between polls; the classifier reads
//! them fresh on every evaluation rather than caching a copy.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{AlertThresholds, Config};

pub struct ThresholdStore {
    inner: RwLock<HashMap<String, AlertThresholds>>,
}

impl ThresholdStore {
    pub fn from_config(config: &Config) -> Self {
        let mut map = HashMap::new();
        for channel in &config.channels {
            map.insert(channel.name.clone(), channel.alerts.unwrap_or_default());
        }
        Self {
            inner: RwLock::new(map),
        }
    }

    /// Thresholds for a channel; unknown channels get the defaults.
    pub async fn get(&self, channel: &str) -> AlertThresholds {
        self.inner
            .read()
            .await
            .get(channel)
            .copied()
            .unwrap_or_default()
    }

    pub async fn set(&self, channel: &str, thresholds: AlertThresholds) {
        self.inner
            .write()
            .await
            .insert(channel.to_string(), thresholds);
    }
}
