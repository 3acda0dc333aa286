use super::Config;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::fs;
use tracing::info;

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_path: &str) -> Result<Self> {
        let config = Self::load_configuration(config_path).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_path: &str) -> Result<Config> {
        let content = fs::read_to_string(config_path)
            .await
            .map_err(|e| anyhow!("Failed to read config {}: {}", config_path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config {}: {}", config_path, e))?;

        for channel in &config.channels {
            for node in &channel.nodes {
                if config.node_address(node).is_none() {
                    return Err(anyhow!(
                        "Channel {} references unknown node {}",
                        channel.name,
                        node
                    ));
                }
            }
        }

        info!(
            "Loaded {} nodes, {} channels from {}",
            config.nodes.len(),
            config.channels.len(),
            config_path
        );

        Ok(config)
    }
}
