use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use console::config::{ConfigManager, NodeKind, ThresholdStore};
use console::crawler::BlockCrawler;
use console::ledger::LedgerDb;
use console::metrics::{GoloopPoller, HealthSnapshotStore, LoopchainPoller, MetricsPoller};
use console::rpc::ChainRpcClient;
use console::scheduler::{CrawlScheduler, MetricsScheduler};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("console=info".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting chain operations console");

    let config_path =
        std::env::var("CONSOLE_CONFIG").unwrap_or_else(|_| "config/console.toml".to_string());
    let config_manager = ConfigManager::new(&config_path).await?;
    let config = config_manager.get_current_config();

    let ledger = Arc::new(LedgerDb::new(&config.chain.db_path).await?);
    info!("Ledger store initialized at {}", config.chain.db_path);

    let thresholds = Arc::new(ThresholdStore::from_config(&config));
    let snapshot = Arc::new(HealthSnapshotStore::new());

    let rpc = ChainRpcClient::new()?;
    let crawler = BlockCrawler::new(rpc, ledger.clone(), config.chain.max_batch_size);

    let poller = match config.metrics.node_kind {
        NodeKind::Loopchain => MetricsPoller::Loopchain(LoopchainPoller::new(&config.metrics)?),
        NodeKind::Goloop => MetricsPoller::Goloop(GoloopPoller::new(config.clone())?),
    };

    let crawl_scheduler = CrawlScheduler::new(crawler, config.clone());
    tokio::spawn(crawl_scheduler.run());

    let metrics_scheduler = MetricsScheduler::new(
        poller,
        config.clone(),
        thresholds.clone(),
        snapshot.clone(),
        ledger.clone(),
    );
    tokio::spawn(metrics_scheduler.run());

    info!(
        "Background schedulers started ({} channels, {} nodes)",
        config.channels.len(),
        config.nodes.len()
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
