pub mod config;
pub mod constants;
pub mod crawler;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod rpc;
pub mod scheduler;

// Re-export commonly used types
pub use config::{AlertThresholds, Config, ConfigManager, NodeKind, ThresholdStore};
pub use crawler::BlockCrawler;
pub use ledger::LedgerDb;
pub use metrics::{HealthSnapshot, HealthSnapshotStore, MetricsPoller};
pub use rpc::ChainRpcClient;
pub use scheduler::{CrawlScheduler, MetricsScheduler};
