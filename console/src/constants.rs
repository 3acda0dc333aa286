//! Application-wide constants for timeouts, retry budgets, and default
//! alert thresholds.

use std::time::Duration;

/// Chain RPC constants
pub mod rpc {
    use super::Duration;

    /// API path appended to every node URI
    pub const API_PATH: &str = "/api/v3";

    /// Channel name whose path segment is omitted on the wire
    pub const DEFAULT_CHANNEL: &str = "default";

    /// Timeout for a single JSON-RPC request
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Attempts before a transaction status lookup is surfaced as failed
    pub const TX_STATUS_ATTEMPTS: u32 = 10;

    /// Delay between transaction status attempts
    pub const TX_STATUS_RETRY_DELAY: Duration = Duration::from_millis(500);
}

/// Metrics backend constants
pub mod metrics {
    use super::Duration;

    /// Timeout for a single backend query
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Range-vector window queried from the backend, in seconds
    pub const WINDOW_SECS: u64 = 60;

    /// Hold seconds seeded when the unsync condition is first observed
    pub const UNSYNC_HOLD_FLOOR_SECS: u64 = 60;

    /// Default query path on the metrics backend
    pub const DEFAULT_QUERY_PATH: &str = "/api/v1/query";
}

/// Default per-channel alert thresholds, used when a channel does not
/// configure its own
pub mod alerts {
    /// Seconds a node may hold the unsync condition before it is flagged
    pub const DEFAULT_UNSYNC_TOLERANCE_SECS: u64 = 360;

    /// Response time above which a node is flagged as slow, in seconds
    pub const DEFAULT_SLOW_RESPONSE_SECS: u64 = 5;

    /// Blocks a node may trail the channel's highest node
    pub const DEFAULT_UNSYNC_BLOCK_GAP: u64 = 100;
}

/// Default scheduler intervals
pub mod intervals {
    /// Default seconds between block crawl passes
    pub const DEFAULT_CRAWL_SECS: u64 = 10;

    /// Default seconds between metrics polls
    pub const DEFAULT_POLL_SECS: u64 = 5;
}
