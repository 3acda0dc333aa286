//! Structured error types for the console core.
//!
//! Most plumbing stays on `anyhow::Result`; these enums cover the cases
//! callers branch on or tests assert against.

use std::fmt;

/// Chain RPC error variants
#[derive(Debug)]
pub enum RpcError {
    /// Node did not answer or answered with a transport error
    Unreachable { uri: String, reason: String },

    /// Response decoded but carried no usable result
    MissingResult { method: String },

    /// Transaction status lookup exhausted its attempt budget
    TxStatusExhausted { tx_hash: String, attempts: u32 },
}

/// Ledger store error variants
#[derive(Debug)]
pub enum LedgerError {
    /// A timestamp range filter supplied exactly one bound
    InvalidTimeRange,

    /// Query arguments out of range (negative limit/offset, empty channel)
    InvalidQuery { reason: String },
}

/// Metrics pipeline error variants
#[derive(Debug)]
pub enum MetricsError {
    /// Backend unreachable or returned a non-success envelope
    Backend { reason: String },

    /// Metric carried a channel id not present in the inventory
    UnknownChannel { id: String },

    /// Metric carried a hostname no configured node address matches
    UnknownNode { host: String },

    /// Backend returned no series at all
    EmptyResult,

    /// A sample value failed to parse
    BadSample { metric: String, reason: String },
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::Unreachable { uri, reason } => {
                write!(f, "node {} unreachable: {}", uri, reason)
            }
            RpcError::MissingResult { method } => {
                write!(f, "no result in {} response", method)
            }
            RpcError::TxStatusExhausted { tx_hash, attempts } => {
                write!(
                    f,
                    "tx status for {} failed after {} attempts",
                    tx_hash, attempts
                )
            }
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::InvalidTimeRange => {
                write!(f, "time range filter requires both bounds or neither")
            }
            LedgerError::InvalidQuery { reason } => {
                write!(f, "invalid query: {}", reason)
            }
        }
    }
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::Backend { reason } => {
                write!(f, "metrics backend error: {}", reason)
            }
            MetricsError::UnknownChannel { id } => {
                write!(f, "channel id {} not found in inventory", id)
            }
            MetricsError::UnknownNode { host } => {
                write!(f, "no configured node matches host {}", host)
            }
            MetricsError::EmptyResult => {
                write!(f, "metrics backend returned no series")
            }
            MetricsError::BadSample { metric, reason } => {
                write!(f, "bad sample for {}: {}", metric, reason)
            }
        }
    }
}

impl std::error::Error for RpcError {}
impl std::error::Error for LedgerError {}
impl std::error::Error for MetricsError {}
